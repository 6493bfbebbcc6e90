//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for LogvaneError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logvane_core::error::{LogvaneError, ParseError, PipelineError, StoreError};

/// 로그 파이프라인 도메인 에러
///
/// 파싱, 수집, 보강, 저장소 통신 등 파이프라인 내부의 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 로그 파싱 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (syslog, w3c)
        format: String,
        /// 실패 위치 (바이트 오프셋)
        offset: u64,
        /// 실패 사유
        reason: String,
    },

    /// 수집기 에러 (파일 I/O, 네트워크 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (file, syslog_udp)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 수신 소켓 바인드 실패
    #[error("bind error: {addr}: {reason}")]
    Bind {
        /// 바인드 주소
        addr: String,
        /// 에러 사유
        reason: String,
    },

    /// GeoIP 참조 데이터베이스 에러
    #[error("reference database error: {path}: {reason}")]
    ReferenceData {
        /// 데이터베이스 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 문서 저장소 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for LogvaneError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Store(e) => LogvaneError::Store(e),
            LogPipelineError::Io(e) => LogvaneError::Io(e),
            LogPipelineError::Parse { offset, reason, .. } => {
                LogvaneError::Parse(ParseError::Failed {
                    offset: usize::try_from(offset).unwrap_or(usize::MAX),
                    reason,
                })
            }
            LogPipelineError::Bind { addr, reason } => {
                LogvaneError::Pipeline(PipelineError::Bind { addr, reason })
            }
            LogPipelineError::ReferenceData { path, reason } => {
                LogvaneError::Pipeline(PipelineError::ReferenceData { path, reason })
            }
            other => LogvaneError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
