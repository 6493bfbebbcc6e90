//! 에러 타입: 도메인별 에러 정의

/// logvane 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogvaneError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 문서 저장소 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 수신 소켓 바인드 실패
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// 참조 데이터베이스(GeoIP 등)를 열 수 없음
    #[error("failed to open reference database {path}: {reason}")]
    ReferenceData { path: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 파싱 실패
    #[error("parse failed at offset {offset}: {reason}")]
    Failed { offset: usize, reason: String },
}

/// 문서 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 연결 실패 (타임아웃 포함)
    #[error("connection failed: {0}")]
    Connection(String),

    /// 저장소가 요청을 거부함
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 응답 본문을 해석할 수 없음
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_rejected_display_includes_status() {
        let err = StoreError::Rejected {
            status: 400,
            body: "mapper_parsing_exception".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("mapper_parsing_exception"));
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: LogvaneError = ConfigError::InvalidValue {
            field: "store.url".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        assert!(matches!(err, LogvaneError::Config(_)));
        assert!(err.to_string().contains("store.url"));
    }

    #[test]
    fn bind_error_display() {
        let err = PipelineError::Bind {
            addr: "0.0.0.0:514".to_owned(),
            reason: "permission denied".to_owned(),
        };
        assert!(err.to_string().contains("0.0.0.0:514"));
    }
}
