//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 파서, 보강기, 라우터, 저장소가 공유하는 레코드 구조를 정의합니다.
//! 레코드는 단계마다 소유권이 통째로 넘어가며, 공유되지 않습니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 레코드 필드의 스칼라 값
///
/// JSON 문서로 직렬화할 때 각 변형은 저장소가 이해하는 기본 형태로 변환됩니다.
/// 타임스탬프는 오프셋을 포함한 RFC 3339 문자열, 좌표는 `{"lat", "lon"}` 객체입니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 문자열
    Text(String),
    /// 정수
    Integer(i64),
    /// 실수
    Float(f64),
    /// 시각 (타임존 포함)
    Timestamp(DateTime<FixedOffset>),
    /// 위도/경도 좌표
    GeoPoint {
        /// 위도
        lat: f64,
        /// 경도
        lon: f64,
    },
}

impl FieldValue {
    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 정수 값이면 반환합니다.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::GeoPoint { lat, lon } => write!(f, "{lat},{lon}"),
        }
    }
}

/// 인덱스 시간 버킷 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    /// ISO 연도 + ISO 주차 (`2024.02`)
    Weekly,
    /// 연도 + 월 (`2024.01`)
    Monthly,
}

impl BucketGranularity {
    /// 타임스탬프를 버킷 문자열로 변환합니다.
    pub fn bucket(&self, ts: &DateTime<FixedOffset>) -> String {
        match self {
            Self::Weekly => ts.format("%G.%V").to_string(),
            Self::Monthly => ts.format("%Y.%m").to_string(),
        }
    }
}

/// 레코드를 만든 문법 (판별자)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// 커널 방화벽 syslog 라인 (문법 A)
    KernelFirewall,
    /// 일반 syslog 라인 (문법 B)
    GenericSyslog,
    /// W3C 고정 컬럼 접근 로그
    W3cAccess,
}

impl RecordKind {
    /// 문서 안에서 타임스탬프가 들어갈 필드명
    ///
    /// syslog 계열은 대문자 `TS`, 파일 계열은 소문자 `ts`를 사용합니다.
    pub fn timestamp_field(&self) -> &'static str {
        match self {
            Self::KernelFirewall | Self::GenericSyslog => "TS",
            Self::W3cAccess => "ts",
        }
    }

    /// 이 종류의 레코드가 사용하는 인덱스 버킷 단위
    pub fn granularity(&self) -> BucketGranularity {
        match self {
            Self::KernelFirewall | Self::GenericSyslog => BucketGranularity::Weekly,
            Self::W3cAccess => BucketGranularity::Monthly,
        }
    }

    /// 로그/메트릭 레이블용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KernelFirewall => "kernel_firewall",
            Self::GenericSyslog => "generic_syslog",
            Self::W3cAccess => "w3c_access",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파싱된 레코드
///
/// 타임스탬프는 필드 맵과 분리해 보관하므로 레코드마다 정확히 하나만 존재합니다.
/// 타임스탬프 필드명과 같은 키로 [`insert`](Self::insert)하면 무시됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    kind: RecordKind,
    timestamp: DateTime<FixedOffset>,
    fields: BTreeMap<String, FieldValue>,
    document_id: Option<String>,
}

impl ParsedRecord {
    /// 새 레코드를 생성합니다.
    pub fn new(kind: RecordKind, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            kind,
            timestamp,
            fields: BTreeMap::new(),
            document_id: None,
        }
    }

    /// 레코드 종류를 반환합니다.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// 이벤트 타임스탬프를 반환합니다.
    pub fn timestamp(&self) -> &DateTime<FixedOffset> {
        &self.timestamp
    }

    /// 필드를 추가하거나 덮어씁니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        if key == self.kind.timestamp_field() {
            tracing::debug!(key = %key, "ignoring field that shadows the record timestamp");
            return;
        }
        self.fields.insert(key, value.into());
    }

    /// 여러 필드를 한 번에 추가합니다.
    pub fn extend<K, I>(&mut self, fields: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        for (key, value) in fields {
            self.insert(key, value);
        }
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// 문자열 필드 값을 조회합니다.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_text)
    }

    /// 필드 존재 여부를 확인합니다.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// 타임스탬프를 제외한 필드를 순회합니다.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 타임스탬프를 제외한 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 타임스탬프 외 필드가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 결정적 문서 ID를 설정합니다 (재처리 시 덮어쓰기용).
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    /// 문서 ID를 반환합니다.
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// 저장소에 기록할 JSON 문서를 만듭니다.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::with_capacity(self.fields.len() + 1);
        for (key, value) in &self.fields {
            let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            doc.insert(key.clone(), json);
        }
        doc.insert(
            self.kind.timestamp_field().to_owned(),
            serde_json::Value::String(self.timestamp.to_rfc3339()),
        );
        serde_json::Value::Object(doc)
    }
}

/// 파일 테일링 재개 위치
///
/// 로컬 디스크가 아니라 저장소의 최신 레코드에서 추론합니다.
/// `file == None, offset == -1`은 "가장 오래된 파일의 처음부터"를 뜻합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 마지막으로 처리한 파일명
    pub file: Option<String>,
    /// 마지막으로 처리한 라인 직후의 바이트 오프셋
    pub offset: i64,
}

impl Checkpoint {
    /// 처음부터 시작하는 체크포인트
    pub fn start() -> Self {
        Self {
            file: None,
            offset: -1,
        }
    }

    /// 특정 파일/오프셋 체크포인트
    pub fn at(file: impl Into<String>, offset: i64) -> Self {
        Self {
            file: Some(file.into()),
            offset,
        }
    }

    /// 이전 기록이 없는 시작 상태인지 확인합니다.
    pub fn is_start(&self) -> bool {
        self.file.is_none()
    }

    /// seek에 사용할 오프셋 (음수는 0으로)
    pub fn resume_offset(&self) -> u64 {
        u64::try_from(self.offset).unwrap_or(0)
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.file.as_deref().unwrap_or("<none>"),
            self.offset
        )
    }
}

/// 템플릿 필드 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// 정확히 일치 검색용 문자열 (분석하지 않음)
    Keyword,
    /// 64비트 정수
    Long,
    /// 배정밀도 실수
    Double,
    /// 날짜/시각
    Date,
    /// IP 주소 (범위 질의 가능)
    Ip,
    /// 지리 좌표
    GeoPoint,
}

impl FieldType {
    /// 값에서 필드 타입을 추론합니다.
    pub fn infer(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(_) => Self::Keyword,
            FieldValue::Integer(_) => Self::Long,
            FieldValue::Float(_) => Self::Double,
            FieldValue::Timestamp(_) => Self::Date,
            FieldValue::GeoPoint { .. } => Self::GeoPoint,
        }
    }

    /// 저장소 매핑에서 사용하는 타입 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Long => "long",
            Self::Double => "double",
            Self::Date => "date",
            Self::Ip => "ip",
            Self::GeoPoint => "geo_point",
        }
    }
}

/// 인덱스 템플릿 선언
///
/// 명시된 필드 외에는 모두 keyword로 동적 매핑됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// 템플릿 이름 (예: `routerlog_template`)
    pub name: String,
    /// 적용 대상 인덱스 패턴 (예: `routerlog-*`)
    pub index_pattern: String,
    /// 필드별 타입 재정의
    pub field_types: BTreeMap<String, FieldType>,
}

impl TemplateSpec {
    /// 문서 타입 접두어에서 표준 이름/패턴의 템플릿을 만듭니다.
    ///
    /// `routerlog` → 이름 `routerlog_template`, 패턴 `routerlog-*`
    pub fn for_document_type(document_type: &str) -> Self {
        Self {
            name: format!("{document_type}_template"),
            index_pattern: format!("{document_type}-*"),
            field_types: BTreeMap::new(),
        }
    }

    /// 필드 타입 재정의를 추가합니다.
    pub fn with_field(mut self, field: impl Into<String>, field_type: FieldType) -> Self {
        self.field_types.insert(field.into(), field_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 10, 22, 31)
            .unwrap()
    }

    #[test]
    fn weekly_bucket_uses_iso_week_year() {
        // 2021-01-01은 ISO 기준 2020년 53주차
        assert_eq!(BucketGranularity::Weekly.bucket(&ts(2021, 1, 1)), "2020.53");
        assert_eq!(BucketGranularity::Weekly.bucket(&ts(2024, 1, 5)), "2024.01");
    }

    #[test]
    fn monthly_bucket() {
        assert_eq!(BucketGranularity::Monthly.bucket(&ts(2023, 1, 5)), "2023.01");
        assert_eq!(BucketGranularity::Monthly.bucket(&ts(2023, 12, 31)), "2023.12");
    }

    #[test]
    fn record_kind_timestamp_field() {
        assert_eq!(RecordKind::KernelFirewall.timestamp_field(), "TS");
        assert_eq!(RecordKind::GenericSyslog.timestamp_field(), "TS");
        assert_eq!(RecordKind::W3cAccess.timestamp_field(), "ts");
    }

    #[test]
    fn record_rejects_timestamp_shadowing() {
        let mut record = ParsedRecord::new(RecordKind::GenericSyslog, ts(2024, 1, 5));
        record.insert("TS", "bogus");
        record.insert("MSG", "hello");
        assert!(!record.contains("TS"));
        assert_eq!(record.get_text("MSG"), Some("hello"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn to_document_contains_single_timestamp() {
        let mut record = ParsedRecord::new(RecordKind::W3cAccess, ts(2023, 1, 5));
        record.insert("c_ip", "8.8.8.8");
        record.insert("offset", FieldValue::Integer(4096));
        record.insert("c_ip_loc", FieldValue::GeoPoint { lat: 37.4, lon: -122.1 });
        assert_eq!(record.get("offset").and_then(FieldValue::as_integer), Some(4096));
        assert_eq!(record.get("c_ip").and_then(FieldValue::as_integer), None);

        let doc = record.to_document();
        assert_eq!(doc["ts"], "2023-01-05T10:22:31+00:00");
        assert_eq!(doc["offset"], 4096);
        assert_eq!(doc["c_ip_loc"]["lat"], 37.4);
        assert_eq!(doc["c_ip_loc"]["lon"], -122.1);
        assert!(doc.get("TS").is_none());
    }

    #[test]
    fn checkpoint_start_state() {
        let cp = Checkpoint::start();
        assert!(cp.is_start());
        assert_eq!(cp.offset, -1);
        assert_eq!(cp.resume_offset(), 0);
        assert_eq!(cp, Checkpoint::default());
    }

    #[test]
    fn checkpoint_resume_offset() {
        let cp = Checkpoint::at("u_ex230105.log", 4096);
        assert!(!cp.is_start());
        assert_eq!(cp.resume_offset(), 4096);
        assert_eq!(cp.to_string(), "u_ex230105.log@4096");
    }

    #[test]
    fn field_type_inference() {
        assert_eq!(FieldType::infer(&FieldValue::from("x")), FieldType::Keyword);
        assert_eq!(FieldType::infer(&FieldValue::Integer(1)), FieldType::Long);
        assert_eq!(FieldType::infer(&FieldValue::Float(1.5)), FieldType::Double);
        assert_eq!(
            FieldType::infer(&FieldValue::Timestamp(ts(2024, 1, 1))),
            FieldType::Date
        );
        assert_eq!(
            FieldType::infer(&FieldValue::GeoPoint { lat: 0.0, lon: 0.0 }),
            FieldType::GeoPoint
        );
    }

    #[test]
    fn template_spec_naming() {
        let spec = TemplateSpec::for_document_type("routerlog")
            .with_field("SRC", FieldType::Ip)
            .with_field("SRC_LOC", FieldType::GeoPoint);
        assert_eq!(spec.name, "routerlog_template");
        assert_eq!(spec.index_pattern, "routerlog-*");
        assert_eq!(spec.field_types.get("SRC"), Some(&FieldType::Ip));
    }

    #[test]
    fn field_type_serializes_snake_case() {
        let json = serde_json::to_string(&FieldType::GeoPoint).unwrap();
        assert_eq!(json, "\"geo_point\"");
    }
}
