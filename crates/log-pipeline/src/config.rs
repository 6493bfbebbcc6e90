//! 로그 파이프라인 설정
//!
//! [`SyslogServiceConfig`]와 [`TailJobConfig`]는 core의
//! [`LogvaneConfig`](logvane_core::config::LogvaneConfig)에서 파생되는 실행 단위별 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use logvane_core::config::LogvaneConfig;
//! use logvane_log_pipeline::config::TailJobConfig;
//!
//! let core_config = LogvaneConfig::default();
//! let config = TailJobConfig::from_core(&core_config)?;
//! ```

use std::path::{Component, Path, PathBuf};

use logvane_core::config::{DEFAULT_W3C_COLUMNS, LogvaneConfig};
use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// UDP syslog 서비스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyslogServiceConfig {
    /// 바인드 주소
    pub bind: String,
    /// 최대 데이터그램 크기 (바이트)
    pub max_datagram_size: usize,
    /// 문법 A 레코드의 문서 타입
    pub firewall_document_type: String,
    /// 문법 B 레코드의 문서 타입
    pub syslog_document_type: String,
}

impl Default for SyslogServiceConfig {
    fn default() -> Self {
        Self::from_core(&LogvaneConfig::default())
    }
}

impl SyslogServiceConfig {
    /// core 설정에서 서비스 설정을 생성합니다.
    pub fn from_core(core: &LogvaneConfig) -> Self {
        Self {
            bind: core.syslog.bind.clone(),
            max_datagram_size: core.syslog.max_datagram_size,
            firewall_document_type: core.syslog.firewall_document_type.clone(),
            syslog_document_type: core.syslog.syslog_document_type.clone(),
        }
    }

    /// 설정 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.bind.is_empty() {
            return Err(LogPipelineError::Config {
                field: "bind".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.max_datagram_size == 0 {
            return Err(LogPipelineError::Config {
                field: "max_datagram_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.firewall_document_type == self.syslog_document_type {
            return Err(LogPipelineError::Config {
                field: "syslog_document_type".to_owned(),
                reason: "must differ from firewall_document_type".to_owned(),
            });
        }
        Ok(())
    }
}

/// 파일 테일링 배치 작업 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailJobConfig {
    /// 로테이션된 로그 파일 디렉토리
    pub log_dir: PathBuf,
    /// 문서 타입 (인덱스 접두어)
    pub document_type: String,
    /// 기본 컬럼 레이아웃 (첫 두 컬럼은 date, time)
    pub columns: Vec<String>,
    /// 템플릿 추론 시 샘플링할 레코드 수
    pub sample_size: usize,
    /// 벌크 요청당 최대 문서 수
    pub bulk_chunk_size: usize,
}

impl Default for TailJobConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/log/iis/W3SVC1"),
            document_type: "iislog".to_owned(),
            columns: split_columns(DEFAULT_W3C_COLUMNS),
            sample_size: 128,
            bulk_chunk_size: 500,
        }
    }
}

impl TailJobConfig {
    /// core 설정에서 작업 설정을 생성하고 검증합니다.
    pub fn from_core(core: &LogvaneConfig) -> Result<Self, LogPipelineError> {
        let config = Self {
            log_dir: PathBuf::from(&core.tail.log_dir),
            document_type: core.tail.document_type.clone(),
            columns: split_columns(&core.tail.columns),
            sample_size: core.tail.sample_size,
            bulk_chunk_size: core.store.bulk_chunk_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        validate_log_dir(&self.log_dir)?;

        if self.columns.len() < 3 || self.columns[0] != "date" || self.columns[1] != "time" {
            return Err(LogPipelineError::Config {
                field: "columns".to_owned(),
                reason: "layout must start with 'date time' followed by data columns".to_owned(),
            });
        }
        if self.sample_size == 0 {
            return Err(LogPipelineError::Config {
                field: "sample_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.bulk_chunk_size == 0 {
            return Err(LogPipelineError::Config {
                field: "bulk_chunk_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

/// 공백으로 구분된 컬럼 목록을 분리합니다.
pub fn split_columns(columns: &str) -> Vec<String> {
    columns.split_whitespace().map(str::to_owned).collect()
}

/// 디렉토리 경로가 안전한지 검증합니다 (path traversal 방지).
fn validate_log_dir(path: &Path) -> Result<(), LogPipelineError> {
    if path.as_os_str().is_empty() {
        return Err(LogPipelineError::Config {
            field: "log_dir".to_owned(),
            reason: "log directory must not be empty".to_owned(),
        });
    }

    if path.components().any(|c| c == Component::ParentDir) {
        return Err(LogPipelineError::Config {
            field: "log_dir".to_owned(),
            reason: format!(
                "log directory '{}' contains path traversal pattern '..'",
                path.display()
            ),
        });
    }

    if !path.is_absolute() {
        return Err(LogPipelineError::Config {
            field: "log_dir".to_owned(),
            reason: format!("log directory '{}' must be an absolute path", path.display()),
        });
    }

    Ok(())
}

/// [`TailJobConfig`] 빌더
#[derive(Debug, Default)]
pub struct TailJobConfigBuilder {
    config: TailJobConfig,
}

impl TailJobConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 디렉토리를 설정합니다.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// 문서 타입을 설정합니다.
    pub fn document_type(mut self, document_type: impl Into<String>) -> Self {
        self.config.document_type = document_type.into();
        self
    }

    /// 기본 컬럼 레이아웃을 설정합니다.
    pub fn columns(mut self, columns: &str) -> Self {
        self.config.columns = split_columns(columns);
        self
    }

    /// 샘플 크기를 설정합니다.
    pub fn sample_size(mut self, size: usize) -> Self {
        self.config.sample_size = size;
        self
    }

    /// 벌크 청크 크기를 설정합니다.
    pub fn bulk_chunk_size(mut self, size: usize) -> Self {
        self.config.bulk_chunk_size = size;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<TailJobConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
