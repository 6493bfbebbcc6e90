//! 인덱스 템플릿 프로비저닝
//!
//! 템플릿은 항상 "삭제 후 생성"으로 다시 만듭니다. 삭제할 템플릿이 없으면
//! [`TemplateDeletion::NotFound`]를 그대로 성공으로 취급하므로 몇 번을 실행해도
//! 최종 템플릿은 같습니다.
//!
//! 매핑 규칙:
//! - 문자열 필드는 동적 템플릿으로 `keyword` (전문 검색 색인 안 함)
//! - 명시한 필드만 `ip`, `geo_point`, `date` 등으로 재정의

use std::collections::BTreeMap;

use logvane_core::error::StoreError;
use logvane_core::store::{DocumentStore, TemplateDeletion};
use logvane_core::types::{FieldType, ParsedRecord, TemplateSpec};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

/// 방화벽 문서 템플릿 (`routerlog` 계열)
pub fn firewall_template(document_type: &str) -> TemplateSpec {
    TemplateSpec::for_document_type(document_type)
        .with_field("SRC", FieldType::Ip)
        .with_field("DST", FieldType::Ip)
        .with_field("SRC_LOC", FieldType::GeoPoint)
        .with_field("DST_LOC", FieldType::GeoPoint)
        .with_field("TS", FieldType::Date)
}

/// 일반 syslog 문서 템플릿
pub fn syslog_template(document_type: &str) -> TemplateSpec {
    TemplateSpec::for_document_type(document_type).with_field("TS", FieldType::Date)
}

/// W3C 접근 로그에서 추론 결과보다 우선하는 타입
pub fn access_log_overrides() -> BTreeMap<String, FieldType> {
    [
        ("c_ip", FieldType::Ip),
        ("s_ip", FieldType::Ip),
        ("c_ip_loc", FieldType::GeoPoint),
        ("s_ip_loc", FieldType::GeoPoint),
        ("ts", FieldType::Date),
    ]
    .into_iter()
    .map(|(k, t)| (k.to_owned(), t))
    .collect()
}

/// 샘플 레코드에서 템플릿을 추론합니다.
///
/// 키마다 관측된 타입이 하나면 그 타입, 둘 이상이면 `keyword`.
/// `overrides`가 추론 결과보다 우선합니다.
pub fn infer_template<'a, I>(
    document_type: &str,
    samples: I,
    overrides: &BTreeMap<String, FieldType>,
) -> TemplateSpec
where
    I: IntoIterator<Item = &'a ParsedRecord>,
{
    let mut observed: BTreeMap<String, FieldType> = BTreeMap::new();
    let mut sampled = 0usize;

    for record in samples {
        sampled += 1;
        let ts_field = record.kind().timestamp_field();
        merge_observation(&mut observed, ts_field, FieldType::Date);
        for (key, value) in record.fields() {
            merge_observation(&mut observed, key, FieldType::infer(value));
        }
    }

    for (key, field_type) in overrides {
        observed.insert(key.clone(), *field_type);
    }

    debug!(document_type, sampled, fields = observed.len(), "template inferred");
    TemplateSpec {
        field_types: observed,
        ..TemplateSpec::for_document_type(document_type)
    }
}

fn merge_observation(observed: &mut BTreeMap<String, FieldType>, key: &str, seen: FieldType) {
    match observed.get(key) {
        None => {
            observed.insert(key.to_owned(), seen);
        }
        Some(existing) if *existing != seen => {
            observed.insert(key.to_owned(), FieldType::Keyword);
        }
        Some(_) => {}
    }
}

/// 템플릿 프로비저너
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaProvisioner {
    legacy: bool,
}

impl SchemaProvisioner {
    /// 프로비저너를 생성합니다.
    ///
    /// `legacy`면 매핑을 문서 타입 아래에 감싸고 `_all`을 끕니다 (타입이 있는 구버전 저장소용).
    pub fn new(legacy: bool) -> Self {
        Self { legacy }
    }

    /// 템플릿 선언으로 매핑 JSON을 만듭니다.
    pub fn build_mapping(&self, spec: &TemplateSpec) -> Value {
        let mut properties = Map::new();
        for (field, field_type) in &spec.field_types {
            properties.insert(field.clone(), json!({ "type": field_type.as_str() }));
        }

        let body = json!({
            "dynamic_templates": [
                {
                    "strings_as_keywords": {
                        "match_mapping_type": "string",
                        "mapping": { "type": "keyword" }
                    }
                }
            ],
            "properties": properties,
        });

        if !self.legacy {
            return body;
        }

        let mut body = body;
        if let Value::Object(map) = &mut body {
            map.insert("_all".to_owned(), json!({ "enabled": false }));
        }
        let document_type = spec
            .index_pattern
            .strip_suffix("-*")
            .unwrap_or(&spec.index_pattern);
        let mut wrapped = Map::new();
        wrapped.insert(document_type.to_owned(), body);
        Value::Object(wrapped)
    }

    /// 템플릿을 삭제한 뒤 다시 생성합니다.
    pub async fn provision<S: DocumentStore>(
        &self,
        store: &S,
        spec: &TemplateSpec,
    ) -> Result<(), StoreError> {
        match store.delete_template(&spec.name).await? {
            TemplateDeletion::Deleted => debug!(template = %spec.name, "existing template deleted"),
            TemplateDeletion::NotFound => debug!(template = %spec.name, "no existing template"),
        }

        let mapping = self.build_mapping(spec);
        store
            .put_template(&spec.name, &spec.index_pattern, &mapping)
            .await?;
        info!(
            template = %spec.name,
            pattern = %spec.index_pattern,
            typed_fields = spec.field_types.len(),
            "template provisioned"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{FixedOffset, TimeZone};
    use logvane_core::types::{FieldValue, RecordKind};

    fn record(fields: &[(&str, FieldValue)]) -> ParsedRecord {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2023, 1, 5, 0, 0, 0)
            .unwrap();
        let mut r = ParsedRecord::new(RecordKind::W3cAccess, ts);
        for (k, v) in fields {
            r.insert(*k, v.clone());
        }
        r
    }

    #[test]
    fn mapping_has_keyword_dynamic_template_and_overrides() {
        let mapping = SchemaProvisioner::new(false).build_mapping(&firewall_template("routerlog"));
        assert_eq!(
            mapping["dynamic_templates"][0]["strings_as_keywords"]["mapping"]["type"],
            "keyword"
        );
        assert_eq!(mapping["properties"]["SRC"]["type"], "ip");
        assert_eq!(mapping["properties"]["DST_LOC"]["type"], "geo_point");
        assert_eq!(mapping["properties"]["TS"]["type"], "date");
    }

    #[test]
    fn legacy_mapping_is_wrapped_under_document_type() {
        let mapping = SchemaProvisioner::new(true).build_mapping(&syslog_template("router_syslog"));
        assert_eq!(mapping["router_syslog"]["_all"]["enabled"], false);
        assert_eq!(mapping["router_syslog"]["properties"]["TS"]["type"], "date");
    }

    #[test]
    fn inference_conflicts_fall_back_to_keyword() {
        let samples = [
            record(&[("sc_status", FieldValue::Integer(200)), ("time_taken", FieldValue::Integer(3))]),
            record(&[("sc_status", FieldValue::from("200")), ("time_taken", FieldValue::Integer(5))]),
        ];
        let spec = infer_template("iislog", &samples, &BTreeMap::new());
        assert_eq!(spec.field_types["sc_status"], FieldType::Keyword);
        assert_eq!(spec.field_types["time_taken"], FieldType::Long);
        assert_eq!(spec.field_types["ts"], FieldType::Date);
    }

    #[test]
    fn overrides_win_over_inference() {
        let samples = [record(&[("c_ip", FieldValue::from("8.8.8.8"))])];
        let spec = infer_template("iislog", &samples, &access_log_overrides());
        assert_eq!(spec.field_types["c_ip"], FieldType::Ip);
        assert_eq!(spec.field_types["s_ip_loc"], FieldType::GeoPoint);
        assert_eq!(spec.name, "iislog_template");
    }

    #[tokio::test]
    async fn provision_twice_is_identical() {
        let store = MemoryStore::new();
        let provisioner = SchemaProvisioner::default();
        let spec = firewall_template("routerlog");

        provisioner.provision(&store, &spec).await.unwrap();
        let first = store.template("routerlog_template").unwrap();
        provisioner.provision(&store, &spec).await.unwrap();
        let second = store.template("routerlog_template").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.0, "routerlog-*");
    }

    #[tokio::test]
    async fn provision_propagates_store_failure() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = SchemaProvisioner::default()
            .provision(&store, &syslog_template("router_syslog"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
