//! logvane.toml 통합 설정 테스트
//!
//! - logvane.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use logvane_core::config::{DEFAULT_W3C_COLUMNS, LogvaneConfig};
use logvane_core::error::{ConfigError, LogvaneError};

// =============================================================================
// logvane.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../logvane.toml.example");
    let config = LogvaneConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../logvane.toml.example");
    let config = LogvaneConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_defaults() {
    let content = include_str!("../../../logvane.toml.example");
    let config = LogvaneConfig::parse(content).expect("should parse");
    let defaults = LogvaneConfig::default();

    assert_eq!(config.store.url, defaults.store.url);
    assert_eq!(config.store.timeout_secs, defaults.store.timeout_secs);
    assert_eq!(config.store.bulk_chunk_size, defaults.store.bulk_chunk_size);
    assert_eq!(config.geoip.asn_db, defaults.geoip.asn_db);
    assert_eq!(config.syslog.bind, defaults.syslog.bind);
    assert_eq!(
        config.syslog.syslog_document_type,
        defaults.syslog.syslog_document_type
    );
    assert_eq!(config.tail.columns, DEFAULT_W3C_COLUMNS);
    assert_eq!(config.metrics.port, defaults.metrics.port);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn store_only_config_keeps_other_defaults() {
    let toml = r#"
[store]
url = "https://es.example.net:9243"
username = "ingest"
password = "secret"
include_type_name = true
"#;
    let config = LogvaneConfig::parse(toml).expect("should parse");
    assert_eq!(config.store.url, "https://es.example.net:9243");
    assert_eq!(config.store.username, "ingest");
    assert!(config.store.include_type_name);
    assert_eq!(config.syslog.firewall_document_type, "routerlog");
    assert!(config.geoip.enabled);
    config.validate().expect("should validate");
}

#[test]
fn custom_tail_columns_parse() {
    let toml = r#"
[tail]
log_dir = "/data/logs"
columns = "date time c-ip cs-method sc-status"
"#;
    let config = LogvaneConfig::parse(toml).expect("should parse");
    assert_eq!(config.tail.columns.split_whitespace().count(), 5);
    config.validate().expect("should validate");
}

// =============================================================================
// 에러 테스트
// =============================================================================

#[test]
fn wrong_type_returns_parse_error() {
    let toml = r#"
[store]
timeout_secs = "forever"
"#;
    let err = LogvaneConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        LogvaneError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn zero_sample_size_fails_validation() {
    let toml = r#"
[tail]
sample_size = 0
"#;
    let config = LogvaneConfig::parse(toml).expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("sample_size"));
}

#[tokio::test]
async fn load_reads_file_from_disk() {
    let dir = std::env::temp_dir().join(format!("logvane-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("logvane.toml");
    std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();

    let config = LogvaneConfig::from_file(&path).await.expect("should load");
    assert_eq!(config.general.log_level, "debug");

    std::fs::remove_dir_all(&dir).unwrap();
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("LOGVANE_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("LOGVANE_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = LogvaneConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("LOGVANE_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("LOGVANE_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_parses_numeric_and_bool_fields() {
    let original_chunk = std::env::var("LOGVANE_STORE_BULK_CHUNK_SIZE").ok();
    let original_geo = std::env::var("LOGVANE_GEOIP_ENABLED").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("LOGVANE_STORE_BULK_CHUNK_SIZE", "250");
        std::env::set_var("LOGVANE_GEOIP_ENABLED", "false");
    }

    let mut config = LogvaneConfig::default();
    config.apply_env_overrides();
    let chunk = config.store.bulk_chunk_size;
    let geo = config.geoip.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original_chunk {
            Some(val) => std::env::set_var("LOGVANE_STORE_BULK_CHUNK_SIZE", val),
            None => std::env::remove_var("LOGVANE_STORE_BULK_CHUNK_SIZE"),
        }
        match original_geo {
            Some(val) => std::env::set_var("LOGVANE_GEOIP_ENABLED", val),
            None => std::env::remove_var("LOGVANE_GEOIP_ENABLED"),
        }
    }

    assert_eq!(chunk, 250);
    assert!(!geo);
}

#[test]
#[serial_test::serial]
fn invalid_env_value_is_ignored() {
    let original = std::env::var("LOGVANE_STORE_TIMEOUT_SECS").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("LOGVANE_STORE_TIMEOUT_SECS", "soon");
    }

    let mut config = LogvaneConfig::default();
    config.apply_env_overrides();
    let timeout = config.store.timeout_secs;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("LOGVANE_STORE_TIMEOUT_SECS", val),
            None => std::env::remove_var("LOGVANE_STORE_TIMEOUT_SECS"),
        }
    }

    assert_eq!(timeout, 240);
}
