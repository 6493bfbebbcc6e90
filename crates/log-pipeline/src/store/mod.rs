//! 문서 저장소 구현체
//!
//! - [`ElasticsearchStore`]: Elasticsearch 호환 HTTP API 클라이언트
//! - [`MemoryStore`]: 프로세스 내 저장소 (테스트/드라이런용)
//!
//! 둘 다 core의 [`DocumentStore`](logvane_core::store::DocumentStore) trait을 구현합니다.

pub mod elasticsearch;
pub mod memory;

pub use elasticsearch::ElasticsearchStore;
pub use memory::{MemoryStore, StoredDocument};
