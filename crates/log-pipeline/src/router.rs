//! 시간 버킷 인덱스 라우팅
//!
//! 인덱스 이름은 문서 타입 접두어와 레코드 타임스탬프의 버킷만으로 정해집니다.
//! syslog 계열은 주 단위(`%G.%V`), 파일 계열은 월 단위(`%Y.%m`)입니다.

use std::time::Instant;

use logvane_core::error::StoreError;
use logvane_core::metrics as m;
use logvane_core::store::{BulkSummary, DocumentStore, IndexRequest};
use logvane_core::types::ParsedRecord;
use tracing::{debug, info, warn};

/// 인덱스 라우터
#[derive(Debug, Clone)]
pub struct IndexRouter {
    document_type: String,
    bulk_chunk_size: usize,
}

impl IndexRouter {
    /// 라우터를 생성합니다. 청크 크기 0은 1로 올립니다.
    pub fn new(document_type: impl Into<String>, bulk_chunk_size: usize) -> Self {
        Self {
            document_type: document_type.into(),
            bulk_chunk_size: bulk_chunk_size.max(1),
        }
    }

    /// 문서 타입
    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    /// 레코드가 기록될 인덱스 이름
    pub fn route(&self, record: &ParsedRecord) -> String {
        let bucket = record.kind().granularity().bucket(record.timestamp());
        format!("{}-{bucket}", self.document_type)
    }

    /// 레코드를 쓰기 요청으로 변환합니다.
    pub fn request(&self, record: &ParsedRecord) -> IndexRequest {
        let request = IndexRequest::new(
            self.route(record),
            self.document_type.clone(),
            record.to_document(),
        );
        match record.document_id() {
            Some(id) => request.with_id(id),
            None => request,
        }
    }

    /// 레코드 한 건을 기록하고 완료를 기다립니다.
    pub async fn write<S: DocumentStore>(
        &self,
        store: &S,
        record: &ParsedRecord,
    ) -> Result<(), StoreError> {
        let request = self.request(record);
        match store.index(&request).await {
            Ok(()) => {
                metrics::counter!(m::STORE_RECORDS_INDEXED_TOTAL, m::LABEL_DOCUMENT_TYPE => self.document_type.clone())
                    .increment(1);
                debug!(index = %request.index, "record indexed");
                Ok(())
            }
            Err(e) => {
                metrics::counter!(m::STORE_WRITE_FAILURES_TOTAL, m::LABEL_DOCUMENT_TYPE => self.document_type.clone())
                    .increment(1);
                Err(e)
            }
        }
    }

    /// 여러 요청을 청크 단위 벌크로 기록합니다.
    ///
    /// 개별 실패는 요약에 집계되고 재시도하지 않습니다.
    pub async fn write_batch<S: DocumentStore>(
        &self,
        store: &S,
        requests: &[IndexRequest],
    ) -> Result<BulkSummary, StoreError> {
        let mut summary = BulkSummary::default();
        for chunk in requests.chunks(self.bulk_chunk_size) {
            let started = Instant::now();
            let part = store.bulk_index(chunk).await?;
            metrics::histogram!(m::STORE_BULK_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            debug!(
                documents = chunk.len(),
                succeeded = part.succeeded,
                failed = part.failed,
                "bulk chunk written"
            );
            summary.merge(part);
        }

        metrics::counter!(m::STORE_RECORDS_INDEXED_TOTAL, m::LABEL_DOCUMENT_TYPE => self.document_type.clone())
            .increment(summary.succeeded as u64);
        if summary.failed > 0 {
            metrics::counter!(m::STORE_WRITE_FAILURES_TOTAL, m::LABEL_DOCUMENT_TYPE => self.document_type.clone())
                .increment(summary.failed as u64);
            warn!(
                document_type = %self.document_type,
                failed = summary.failed,
                errors = ?summary.errors,
                "bulk write had failures"
            );
        }
        info!(
            document_type = %self.document_type,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "bulk write finished"
        );
        Ok(summary)
    }
}
