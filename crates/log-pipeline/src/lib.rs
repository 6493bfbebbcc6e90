//! # logvane-log-pipeline
//!
//! 원시 로그 라인을 구조화/보강된 문서로 바꿔 시간 버킷 인덱스에 기록하는 파이프라인입니다.
//!
//! # 모듈 구성
//!
//! - [`collector`]: 원시 라인 수집 (UDP syslog, 로테이션 파일 테일링)
//! - [`parser`]: syslog 이중 문법, W3C 고정 컬럼 파서
//! - [`enrich`]: GeoIP 조회, User-Agent 평탄화
//! - [`checkpoint`]: 저장소 기반 테일링 재개 위치 추론
//! - [`schema`]: 인덱스 템플릿 프로비저닝 및 추론
//! - [`router`]: 시간 버킷 인덱스 라우팅, 단건/벌크 쓰기
//! - [`store`]: `DocumentStore` 구현체 (HTTP, 인메모리)
//! - [`pipeline`]: UDP 서비스와 테일 잡 오케스트레이션
//! - [`config`]: 파이프라인 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! SyslogUdpCollector -> LineGrammar -> GeoEnricher -> IndexRouter::write
//! FileTailer -> W3cParser -> GeoEnricher + UserAgentFlattener -> IndexRouter::write_batch
//!      ^
//!  CheckpointResolver (저장소의 최신 레코드)
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod router;
pub mod schema;

pub mod collector;
pub mod enrich;
pub mod parser;
pub mod store;

// --- 주요 타입 re-export ---

// 서비스
pub use pipeline::{IngestContext, LineOutcome, SyslogService, TailJob, TailReport};

// 설정
pub use config::{SyslogServiceConfig, TailJobConfig, TailJobConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::{GrammarMatch, LineGrammar, LocalZone, W3cParser};

// 보강
pub use enrich::{GeoEnricher, GeoLookup, MaxMindLookup, UserAgentFlattener};

// 체크포인트, 스키마, 라우팅
pub use checkpoint::CheckpointResolver;
pub use router::IndexRouter;
pub use schema::SchemaProvisioner;

// 수집기
pub use collector::{FileTailer, RawLine, SyslogUdpCollector};

// 저장소
pub use store::{ElasticsearchStore, MemoryStore};
