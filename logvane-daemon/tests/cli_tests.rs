//! CLI surface tests.
//!
//! The only accepted positional argument is the literal `initialize_template`.

use logvane_daemon::cli::{Command, DaemonCli};

#[test]
fn no_arguments_runs_the_service() {
    let cli = DaemonCli::try_parse_as("logvane-syslogd", ["logvane-syslogd"]).unwrap();
    assert_eq!(cli.command, None);
    assert!(!cli.initialize_template());
    assert!(cli.config.is_none());
}

#[test]
fn initialize_template_literal_is_accepted() {
    let cli =
        DaemonCli::try_parse_as("logvane-tail", ["logvane-tail", "initialize_template"]).unwrap();
    assert_eq!(cli.command, Some(Command::InitializeTemplate));
    assert!(cli.initialize_template());
}

#[test]
fn unknown_positional_is_a_usage_error() {
    let err = DaemonCli::try_parse_as("logvane-syslogd", ["logvane-syslogd", "start"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn extra_positional_is_a_usage_error() {
    let result = DaemonCli::try_parse_as(
        "logvane-syslogd",
        ["logvane-syslogd", "initialize_template", "again"],
    );
    assert!(result.is_err());
}

#[test]
fn flags_are_parsed() {
    let cli = DaemonCli::try_parse_as(
        "logvane-tail",
        [
            "logvane-tail",
            "--config",
            "/tmp/logvane.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
        ],
    )
    .unwrap();
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/logvane.toml")));
    assert_eq!(cli.log_level.as_deref(), Some("debug"));
    assert_eq!(cli.log_format.as_deref(), Some("pretty"));
}
