//! 설정 관리: logvane.toml 파싱 및 런타임 설정
//!
//! [`LogvaneConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGVANE_STORE_URL=http://es:9200` 형식)
//! 3. 설정 파일 (`logvane.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logvane_core::error::LogvaneError> {
//! use logvane_core::config::LogvaneConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogvaneConfig::load("logvane.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogvaneConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogvaneError};

/// logvane 통합 설정
///
/// `logvane.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogvaneConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 문서 저장소 설정
    #[serde(default)]
    pub store: StoreConfig,
    /// GeoIP 참조 데이터베이스 설정
    #[serde(default)]
    pub geoip: GeoIpConfig,
    /// UDP syslog 수신 설정
    #[serde(default)]
    pub syslog: SyslogConfig,
    /// 파일 테일링 설정
    #[serde(default)]
    pub tail: TailConfig,
    /// 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogvaneConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogvaneError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogvaneError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogvaneError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogvaneError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogvaneError> {
        toml::from_str(toml_str).map_err(|e| {
            LogvaneError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGVANE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGVANE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGVANE_GENERAL_LOG_FORMAT");

        // Store
        override_string(&mut self.store.url, "LOGVANE_STORE_URL");
        override_u64(&mut self.store.timeout_secs, "LOGVANE_STORE_TIMEOUT_SECS");
        override_string(&mut self.store.username, "LOGVANE_STORE_USERNAME");
        override_string(&mut self.store.password, "LOGVANE_STORE_PASSWORD");
        override_bool(
            &mut self.store.include_type_name,
            "LOGVANE_STORE_INCLUDE_TYPE_NAME",
        );
        override_usize(
            &mut self.store.bulk_chunk_size,
            "LOGVANE_STORE_BULK_CHUNK_SIZE",
        );

        // GeoIP
        override_bool(&mut self.geoip.enabled, "LOGVANE_GEOIP_ENABLED");
        override_string(&mut self.geoip.asn_db, "LOGVANE_GEOIP_ASN_DB");
        override_string(&mut self.geoip.city_db, "LOGVANE_GEOIP_CITY_DB");

        // Syslog
        override_string(&mut self.syslog.bind, "LOGVANE_SYSLOG_BIND");
        override_usize(
            &mut self.syslog.max_datagram_size,
            "LOGVANE_SYSLOG_MAX_DATAGRAM_SIZE",
        );
        override_string(
            &mut self.syslog.firewall_document_type,
            "LOGVANE_SYSLOG_FIREWALL_DOCUMENT_TYPE",
        );
        override_string(
            &mut self.syslog.syslog_document_type,
            "LOGVANE_SYSLOG_SYSLOG_DOCUMENT_TYPE",
        );

        // Tail
        override_string(&mut self.tail.log_dir, "LOGVANE_TAIL_LOG_DIR");
        override_string(&mut self.tail.document_type, "LOGVANE_TAIL_DOCUMENT_TYPE");
        override_string(&mut self.tail.columns, "LOGVANE_TAIL_COLUMNS");
        override_usize(&mut self.tail.sample_size, "LOGVANE_TAIL_SAMPLE_SIZE");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGVANE_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGVANE_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGVANE_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogvaneError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.store.url.trim().is_empty() {
            return Err(invalid("store.url", "must not be empty"));
        }
        if self.store.timeout_secs == 0 {
            return Err(invalid("store.timeout_secs", "must be greater than 0"));
        }
        if self.store.bulk_chunk_size == 0 {
            return Err(invalid("store.bulk_chunk_size", "must be greater than 0"));
        }

        if self.geoip.enabled && (self.geoip.asn_db.is_empty() || self.geoip.city_db.is_empty()) {
            return Err(invalid(
                "geoip",
                "asn_db and city_db must be set when geoip is enabled",
            ));
        }

        if self.syslog.max_datagram_size == 0 || self.syslog.max_datagram_size > 65_535 {
            return Err(invalid("syslog.max_datagram_size", "must be 1-65535"));
        }
        for (field, value) in [
            (
                "syslog.firewall_document_type",
                &self.syslog.firewall_document_type,
            ),
            (
                "syslog.syslog_document_type",
                &self.syslog.syslog_document_type,
            ),
            ("tail.document_type", &self.tail.document_type),
        ] {
            validate_document_type(field, value)?;
        }

        validate_log_dir(&self.tail.log_dir)?;
        if self.tail.columns.split_whitespace().count() < 3 {
            return Err(invalid(
                "tail.columns",
                "must declare date, time and at least one more column",
            ));
        }
        if self.tail.sample_size == 0 {
            return Err(invalid("tail.sample_size", "must be greater than 0"));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 문서 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 저장소 HTTP 엔드포인트
    pub url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 기본 인증 사용자명 (비어 있으면 인증 없음)
    pub username: String,
    /// 기본 인증 비밀번호
    pub password: String,
    /// 구형 클러스터용: 요청 경로와 벌크 메타데이터에 문서 타입을 포함
    pub include_type_name: bool,
    /// 벌크 요청당 최대 문서 수
    pub bulk_chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_owned(),
            timeout_secs: 240,
            username: String::new(),
            password: String::new(),
            include_type_name: false,
            bulk_chunk_size: 500,
        }
    }
}

/// GeoIP 참조 데이터베이스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoIpConfig {
    /// 보강 활성화 여부
    pub enabled: bool,
    /// ASN(조직) 데이터베이스 경로
    pub asn_db: String,
    /// 도시/좌표 데이터베이스 경로
    pub city_db: String,
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            asn_db: "/usr/share/GeoIP/GeoLite2-ASN.mmdb".to_owned(),
            city_db: "/usr/share/GeoIP/GeoLite2-City.mmdb".to_owned(),
        }
    }
}

/// UDP syslog 수신 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    /// 바인드 주소
    pub bind: String,
    /// 최대 데이터그램 크기 (바이트)
    pub max_datagram_size: usize,
    /// 방화벽 레코드 문서 타입 (인덱스 접두어)
    pub firewall_document_type: String,
    /// 일반 syslog 레코드 문서 타입 (인덱스 접두어)
    pub syslog_document_type: String,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:514".to_owned(),
            max_datagram_size: 65_535,
            firewall_document_type: "routerlog".to_owned(),
            syslog_document_type: "router_syslog".to_owned(),
        }
    }
}

/// W3C 접근 로그 기본 컬럼 (헤더 `#Fields:`가 없을 때 사용)
pub const DEFAULT_W3C_COLUMNS: &str = "date time s-ip cs-method cs-uri-stem cs-uri-query s-port \
    cs-username c-ip cs(User-Agent) cs(Referer) sc-status sc-substatus sc-win32-status time-taken";

/// 파일 테일링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// 로테이션된 로그 파일 디렉토리 (절대 경로)
    pub log_dir: String,
    /// 문서 타입 (인덱스 접두어)
    pub document_type: String,
    /// 공백으로 구분된 기본 컬럼 목록 (첫 두 컬럼은 date, time)
    pub columns: String,
    /// 템플릿 추론 시 샘플링할 레코드 수
    pub sample_size: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            log_dir: "/var/log/iis/W3SVC1".to_owned(),
            document_type: "iislog".to_owned(),
            columns: DEFAULT_W3C_COLUMNS.to_owned(),
            sample_size: 128,
        }
    }
}

/// 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 리슨 주소
    pub listen_addr: String,
    /// 리슨 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogvaneError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 문서 타입은 인덱스 이름의 접두어이므로 소문자/숫자/`_`만 허용합니다.
fn validate_document_type(field: &str, value: &str) -> Result<(), LogvaneError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("'{value}' must be non-empty and contain only [a-z0-9_]"),
        ))
    }
}

/// 테일링 디렉토리 경로 검증 (절대 경로, `..` 금지)
fn validate_log_dir(log_dir: &str) -> Result<(), LogvaneError> {
    if log_dir.is_empty() {
        return Err(invalid("tail.log_dir", "must not be empty"));
    }
    let path = Path::new(log_dir);
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(invalid(
            "tail.log_dir",
            format!("'{log_dir}' contains path traversal pattern '..'"),
        ));
    }
    if !path.is_absolute() {
        return Err(invalid(
            "tail.log_dir",
            format!("'{log_dir}' must be an absolute path"),
        ));
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
