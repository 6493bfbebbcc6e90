//! 문서 저장소 trait: 외부 협력자와의 좁은 인터페이스
//!
//! 파이프라인은 저장소의 템플릿 API, 단건/벌크 쓰기, 체크포인트용 검색만 사용합니다.
//! 구현체는 `logvane-log-pipeline`의 HTTP 클라이언트와 인메모리 저장소가 있습니다.
//!
//! # 사용 예시
//! ```ignore
//! use logvane_core::store::{DocumentStore, IndexRequest};
//!
//! let req = IndexRequest::new("routerlog-2024.01", "routerlog", doc);
//! store.index(&req).await?;
//! ```

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// 템플릿 삭제 결과
///
/// 존재하지 않는 템플릿 삭제도 실패가 아니라 `NotFound` 결과로 돌려줍니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateDeletion {
    /// 기존 템플릿을 삭제함
    Deleted,
    /// 삭제할 템플릿이 없었음
    NotFound,
}

/// 단일 문서 쓰기 요청
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    /// 대상 인덱스 (예: `routerlog-2024.01`)
    pub index: String,
    /// 문서 타입 (인덱스 접두어와 같음)
    pub document_type: String,
    /// 결정적 문서 ID (없으면 저장소가 생성)
    pub id: Option<String>,
    /// 문서 본문
    pub body: serde_json::Value,
}

impl IndexRequest {
    /// 새 요청을 생성합니다.
    pub fn new(
        index: impl Into<String>,
        document_type: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            index: index.into(),
            document_type: document_type.into(),
            id: None,
            body,
        }
    }

    /// 문서 ID를 지정합니다.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// 벌크 쓰기 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    /// 성공한 문서 수
    pub succeeded: usize,
    /// 실패한 문서 수
    pub failed: usize,
    /// 실패 사유 (최대 몇 건만 보관)
    pub errors: Vec<String>,
}

impl BulkSummary {
    /// 보관할 실패 사유의 최대 개수
    pub const MAX_ERRORS: usize = 10;

    /// 다른 요약을 합칩니다.
    pub fn merge(&mut self, other: BulkSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        let room = Self::MAX_ERRORS.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.into_iter().take(room));
    }

    /// 실패 사유를 기록합니다.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.failed += 1;
        if self.errors.len() < Self::MAX_ERRORS {
            self.errors.push(reason.into());
        }
    }

    /// 처리된 총 문서 수
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// 정렬 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// 오름차순
    Asc,
    /// 내림차순
    Desc,
}

/// 검색 요청
///
/// 체크포인트 조회에만 쓰이므로 전체 일치 질의 + 정렬 + 크기 제한만 표현합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// 검색 대상 인덱스 패턴
    pub index: String,
    /// 반환할 `_source` 필드 (비어 있으면 전체)
    pub source_fields: Vec<String>,
    /// 정렬 키 목록 (앞쪽이 우선)
    pub sort: Vec<(String, SortOrder)>,
    /// 최대 반환 개수
    pub size: usize,
}

/// 문서 저장소 trait
///
/// 모든 메서드는 저장소 클라이언트 자체의 타임아웃 외에 재시도/취소를 하지 않습니다.
pub trait DocumentStore: Send + Sync {
    /// 저장소에 연결 가능한지 확인합니다.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 인덱스 템플릿을 삭제합니다. 없으면 `NotFound`를 반환합니다.
    fn delete_template(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<TemplateDeletion, StoreError>> + Send;

    /// 인덱스 패턴에 매핑을 묶는 템플릿을 생성합니다.
    fn put_template(
        &self,
        name: &str,
        index_pattern: &str,
        mapping: &serde_json::Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 문서 한 건을 동기적으로 기록합니다.
    fn index(&self, request: &IndexRequest) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 여러 문서를 한 번에 기록합니다.
    ///
    /// 개별 문서 실패는 에러가 아니라 요약에 집계됩니다.
    fn bulk_index(
        &self,
        requests: &[IndexRequest],
    ) -> impl Future<Output = Result<BulkSummary, StoreError>> + Send;

    /// 검색하여 일치한 문서의 `_source`를 순서대로 반환합니다.
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<Vec<serde_json::Value>, StoreError>> + Send;

    /// 인덱스 패턴을 새로 고쳐 방금 쓴 문서를 검색 가능하게 합니다.
    fn refresh(&self, index_pattern: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
