//! # logvane-core
//!
//! logvane 구성 요소가 공유하는 레코드 타입, 문서 저장소 trait, 에러, 설정을 제공합니다.
//!
//! - [`types`]: 파싱된 레코드, 체크포인트, 템플릿 선언
//! - [`store`]: 문서 저장소와의 좁은 인터페이스 ([`DocumentStore`])
//! - [`config`]: `logvane.toml` 로딩과 환경변수 오버라이드
//! - [`error`]: 도메인별 에러 계층
//! - [`metrics`]: Prometheus 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LogvaneError, ParseError, PipelineError, StoreError};

// 설정
pub use config::LogvaneConfig;

// 저장소 trait
pub use store::{
    BulkSummary, DocumentStore, IndexRequest, SearchRequest, SortOrder, TemplateDeletion,
};

// 도메인 타입
pub use types::{
    BucketGranularity, Checkpoint, FieldType, FieldValue, ParsedRecord, RecordKind, TemplateSpec,
};
