//! CLI argument definitions shared by the logvane binaries.
//!
//! Both `logvane-syslogd` and `logvane-tail` accept the same surface:
//! no positional argument runs the service, the single literal
//! `initialize_template` provisions index templates and exits.
//! Anything else is rejected by clap as a usage error.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};

use logvane_core::config::LogvaneConfig;

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/logvane/logvane.toml";

/// One-shot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    /// Delete and recreate the index templates, then exit.
    #[value(name = "initialize_template")]
    InitializeTemplate,
}

/// logvane log ingestion daemon.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Optional one-shot command. Without it the service runs.
    #[arg(value_enum)]
    pub command: Option<Command>,

    /// Path to logvane.toml configuration file.
    ///
    /// Defaults to /etc/logvane/logvane.toml when present, built-in defaults otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,
}

impl DaemonCli {
    /// Parse process arguments, reporting usage under the given binary name.
    pub fn parse_as(name: &'static str) -> Self {
        Self::try_parse_as(name, std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse the given arguments under the given binary name.
    pub fn try_parse_as<I, T>(name: &'static str, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().name(name).try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Whether the template provisioning command was requested.
    pub fn initialize_template(&self) -> bool {
        self.command == Some(Command::InitializeTemplate)
    }

    /// Load configuration, apply CLI overrides and validate.
    ///
    /// Precedence: CLI flags > `LOGVANE_*` environment > file > defaults.
    pub async fn load_config(&self) -> Result<LogvaneConfig> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
        };
        let mut config = match &path {
            Some(path) => LogvaneConfig::from_file(path)
                .await
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => LogvaneConfig::default(),
        };
        config.apply_env_overrides();

        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }

        config.validate().context("config validation failed")?;
        Ok(config)
    }
}
