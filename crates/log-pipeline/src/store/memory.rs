//! 인메모리 문서 저장소
//!
//! 외부 저장소 없이 파이프라인 전체를 실행할 수 있게 합니다.
//! 같은 ID로 다시 쓰면 덮어쓰므로 재처리 시 중복이 생기지 않는 동작도 그대로 재현합니다.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use logvane_core::error::StoreError;
use logvane_core::store::{
    BulkSummary, DocumentStore, IndexRequest, SearchRequest, SortOrder, TemplateDeletion,
};
use serde_json::Value;

/// 저장된 문서
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// 인덱스 이름
    pub index: String,
    /// 문서 타입
    pub document_type: String,
    /// 문서 ID
    pub id: Option<String>,
    /// 본문
    pub body: Value,
}

#[derive(Debug, Default)]
struct Inner {
    templates: BTreeMap<String, (String, Value)>,
    documents: Vec<StoredDocument>,
    rejected_indices: Vec<String>,
    unavailable: bool,
    bulk_calls: usize,
    single_writes: usize,
    refreshes: Vec<String>,
}

/// 인메모리 문서 저장소
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 저장된 모든 문서
    pub fn documents(&self) -> Vec<StoredDocument> {
        self.lock().documents.clone()
    }

    /// 특정 인덱스의 문서
    pub fn documents_in(&self, index: &str) -> Vec<StoredDocument> {
        self.lock()
            .documents
            .iter()
            .filter(|d| d.index == index)
            .cloned()
            .collect()
    }

    /// 템플릿 조회: (인덱스 패턴, 매핑)
    pub fn template(&self, name: &str) -> Option<(String, Value)> {
        self.lock().templates.get(name).cloned()
    }

    /// 벌크 호출 횟수
    pub fn bulk_calls(&self) -> usize {
        self.lock().bulk_calls
    }

    /// 단건 쓰기 횟수
    pub fn single_writes(&self) -> usize {
        self.lock().single_writes
    }

    /// 새로 고침된 패턴 목록
    pub fn refreshes(&self) -> Vec<String> {
        self.lock().refreshes.clone()
    }

    /// 이 인덱스로 향하는 쓰기를 거부하게 합니다.
    pub fn reject_index(&self, index: impl Into<String>) {
        self.lock().rejected_indices.push(index.into());
    }

    /// 연결 실패를 흉내냅니다.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    fn check_available(inner: &Inner) -> Result<(), StoreError> {
        if inner.unavailable {
            return Err(StoreError::Connection("memory store unavailable".to_owned()));
        }
        Ok(())
    }

    fn store(inner: &mut Inner, request: &IndexRequest) -> Result<(), StoreError> {
        if inner.rejected_indices.iter().any(|i| i == &request.index) {
            return Err(StoreError::Rejected {
                status: 400,
                body: format!("index {} rejects writes", request.index),
            });
        }
        let doc = StoredDocument {
            index: request.index.clone(),
            document_type: request.document_type.clone(),
            id: request.id.clone(),
            body: request.body.clone(),
        };
        let existing = request.id.as_ref().and_then(|id| {
            inner
                .documents
                .iter_mut()
                .find(|d| d.index == doc.index && d.id.as_ref() == Some(id))
        });
        match existing {
            Some(slot) => *slot = doc,
            None => inner.documents.push(doc),
        }
        Ok(())
    }
}

/// `routerlog-*` 형태의 단순 패턴 매칭 (`*`는 끝에만 허용)
fn matches_pattern(pattern: &str, index: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => index.starts_with(prefix),
        None => pattern == index,
    }
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Self::check_available(&self.lock())
    }

    async fn delete_template(&self, name: &str) -> Result<TemplateDeletion, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        Ok(match inner.templates.remove(name) {
            Some(_) => TemplateDeletion::Deleted,
            None => TemplateDeletion::NotFound,
        })
    }

    async fn put_template(
        &self,
        name: &str,
        index_pattern: &str,
        mapping: &Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner
            .templates
            .insert(name.to_owned(), (index_pattern.to_owned(), mapping.clone()));
        Ok(())
    }

    async fn index(&self, request: &IndexRequest) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.single_writes += 1;
        Self::store(&mut inner, request)
    }

    async fn bulk_index(&self, requests: &[IndexRequest]) -> Result<BulkSummary, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.bulk_calls += 1;
        let mut summary = BulkSummary::default();
        for request in requests {
            match Self::store(&mut inner, request) {
                Ok(()) => summary.succeeded += 1,
                Err(e) => summary.record_failure(e.to_string()),
            }
        }
        Ok(summary)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>, StoreError> {
        let inner = self.lock();
        Self::check_available(&inner)?;

        let mut hits: Vec<&Value> = inner
            .documents
            .iter()
            .filter(|d| matches_pattern(&request.index, &d.index))
            .map(|d| &d.body)
            .collect();

        hits.sort_by(|a, b| {
            for (field, order) in &request.sort {
                let ord = compare_json(a.get(field), b.get(field));
                let ord = match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        Ok(hits
            .into_iter()
            .take(request.size)
            .map(|body| {
                if request.source_fields.is_empty() {
                    return body.clone();
                }
                let projected: serde_json::Map<String, Value> = request
                    .source_fields
                    .iter()
                    .filter_map(|f| body.get(f).map(|v| (f.clone(), v.clone())))
                    .collect();
                Value::Object(projected)
            })
            .collect())
    }

    async fn refresh(&self, index_pattern: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.refreshes.push(index_pattern.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn same_id_overwrites() {
        let store = MemoryStore::new();
        let first = IndexRequest::new("iislog-2023.01", "iislog", json!({"v": 1})).with_id("f:1");
        let second = IndexRequest::new("iislog-2023.01", "iislog", json!({"v": 2})).with_id("f:1");
        store.bulk_index(&[first, second]).await.unwrap();
        let docs = store.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body["v"], 2);
    }

    #[tokio::test]
    async fn search_sorts_and_projects() {
        let store = MemoryStore::new();
        for (file, offset) in [("u_ex230104.log", 900), ("u_ex230105.log", 100), ("u_ex230105.log", 4096)] {
            store
                .index(&IndexRequest::new(
                    "iislog-2023.01",
                    "iislog",
                    json!({"file": file, "offset": offset, "c_ip": "8.8.8.8"}),
                ))
                .await
                .unwrap();
        }
        let request = SearchRequest {
            index: "iislog-*".to_owned(),
            source_fields: vec!["file".to_owned(), "offset".to_owned()],
            sort: vec![
                ("file".to_owned(), SortOrder::Desc),
                ("offset".to_owned(), SortOrder::Desc),
            ],
            size: 1,
        };
        let hits = store.search(&request).await.unwrap();
        assert_eq!(hits, vec![json!({"file": "u_ex230105.log", "offset": 4096})]);
    }

    #[tokio::test]
    async fn rejected_index_counts_as_bulk_failure() {
        let store = MemoryStore::new();
        store.reject_index("iislog-2023.02");
        let summary = store
            .bulk_index(&[
                IndexRequest::new("iislog-2023.01", "iislog", json!({})),
                IndexRequest::new("iislog-2023.02", "iislog", json!({})),
            ])
            .await
            .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_ping() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Connection(_))));
    }

    #[test]
    fn pattern_matching() {
        assert!(matches_pattern("routerlog-*", "routerlog-2024.01"));
        assert!(!matches_pattern("routerlog-*", "router_syslog-2024.01"));
        assert!(matches_pattern("iislog-2023.01", "iislog-2023.01"));
    }
}
