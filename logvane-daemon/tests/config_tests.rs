//! Configuration resolution tests.
//!
//! Covers file loading, environment overrides and CLI flag precedence.

use std::io::Write;

use logvane_daemon::cli::DaemonCli;

fn cli_with(args: &[&str]) -> DaemonCli {
    let mut full = vec!["logvane-syslogd"];
    full.extend_from_slice(args);
    DaemonCli::try_parse_as("logvane-syslogd", full).unwrap()
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
#[serial_test::serial]
async fn file_values_are_loaded() {
    let file = config_file(
        r#"
[store]
url = "http://search.internal:9200"

[syslog]
bind = "127.0.0.1:5514"
"#,
    );
    let path = file.path().to_str().unwrap().to_owned();
    let config = cli_with(&["--config", &path]).load_config().await.unwrap();
    assert_eq!(config.store.url, "http://search.internal:9200");
    assert_eq!(config.syslog.bind, "127.0.0.1:5514");
    assert_eq!(config.tail.document_type, "iislog");
}

#[tokio::test]
#[serial_test::serial]
async fn cli_flags_win_over_environment() {
    unsafe { std::env::set_var("LOGVANE_GENERAL_LOG_LEVEL", "warn") };
    let file = config_file("[general]\nlog_level = \"error\"\n");
    let path = file.path().to_str().unwrap().to_owned();

    let from_env = cli_with(&["--config", &path]).load_config().await.unwrap();
    let from_flag = cli_with(&["--config", &path, "--log-level", "debug"])
        .load_config()
        .await
        .unwrap();
    unsafe { std::env::remove_var("LOGVANE_GENERAL_LOG_LEVEL") };

    assert_eq!(from_env.general.log_level, "warn");
    assert_eq!(from_flag.general.log_level, "debug");
}

#[tokio::test]
#[serial_test::serial]
async fn invalid_flag_value_fails_validation() {
    let file = config_file("");
    let path = file.path().to_str().unwrap().to_owned();
    let err = cli_with(&["--config", &path, "--log-format", "xml"])
        .load_config()
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("validation"));
}

#[tokio::test]
#[serial_test::serial]
async fn missing_explicit_config_is_an_error() {
    let err = cli_with(&["--config", "/nonexistent/logvane.toml"])
        .load_config()
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/logvane.toml"));
}

#[tokio::test]
#[serial_test::serial]
async fn example_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../logvane.toml.example");
    let config = cli_with(&["--config", path]).load_config().await.unwrap();
    assert_eq!(config.store.bulk_chunk_size, 500);
}
