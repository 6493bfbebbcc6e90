//! 체크포인트 추론
//!
//! 로컬 상태 파일 없이 저장소에서 해당 문서 타입의 가장 최근 레코드를 조회해
//! (파일, 오프셋)을 복원합니다. 저장소에 쓰는 프로세스가 하나라고 가정합니다.

use logvane_core::error::StoreError;
use logvane_core::store::{DocumentStore, SearchRequest, SortOrder};
use logvane_core::types::Checkpoint;
use serde_json::Value;
use tracing::{debug, info};

/// 파일명 필드
pub const FILE_FIELD: &str = "file";
/// 오프셋 필드
pub const OFFSET_FIELD: &str = "offset";

/// 저장소 기반 체크포인트 추론기
#[derive(Debug, Clone)]
pub struct CheckpointResolver {
    document_type: String,
}

impl CheckpointResolver {
    /// 문서 타입에 대한 추론기를 생성합니다.
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
        }
    }

    /// 최신 레코드 1건을 찾는 검색 요청
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            index: format!("{}-*", self.document_type),
            source_fields: vec![FILE_FIELD.to_owned(), OFFSET_FIELD.to_owned()],
            sort: vec![
                (FILE_FIELD.to_owned(), SortOrder::Desc),
                (OFFSET_FIELD.to_owned(), SortOrder::Desc),
            ],
            size: 1,
        }
    }

    /// 저장소를 조회해 체크포인트를 반환합니다.
    ///
    /// 레코드가 없으면 [`Checkpoint::start`].
    pub async fn resolve<S: DocumentStore>(&self, store: &S) -> Result<Checkpoint, StoreError> {
        let hits = store.search(&self.search_request()).await?;
        let checkpoint = match hits.first() {
            Some(hit) => Self::from_hit(hit)?,
            None => {
                debug!(document_type = %self.document_type, "no previous records");
                Checkpoint::start()
            }
        };
        info!(
            document_type = %self.document_type,
            checkpoint = %checkpoint,
            "checkpoint resolved"
        );
        Ok(checkpoint)
    }

    /// 검색 결과 한 건에서 체크포인트를 읽습니다.
    ///
    /// 오프셋은 숫자 또는 숫자 문자열을 허용합니다.
    pub fn from_hit(hit: &Value) -> Result<Checkpoint, StoreError> {
        let file = hit
            .get(FILE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::InvalidResponse("checkpoint hit has no file".to_owned()))?;
        let offset = match hit.get(OFFSET_FIELD) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            StoreError::InvalidResponse(format!("checkpoint hit has no usable offset: {hit}"))
        })?;
        Ok(Checkpoint::at(file, offset))
    }
}
