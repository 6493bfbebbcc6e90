//! `logvane-syslogd`: long-running UDP syslog ingestion service.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use logvane_core::config::LogvaneConfig;
use logvane_daemon::bootstrap;
use logvane_daemon::cli::DaemonCli;
use logvane_daemon::logging::init_tracing;
use logvane_log_pipeline::{SyslogService, SyslogServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse_as("logvane-syslogd");
    let config = cli.load_config().await?;
    init_tracing(&config.general)?;
    bootstrap::install_metrics(&config)?;

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(error = %format!("{e:#}"), "logvane-syslogd failed");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: &DaemonCli, config: &LogvaneConfig) -> Result<()> {
    tracing::info!("logvane-syslogd starting");

    let ctx = bootstrap::build_context(config).await?;
    let service = SyslogService::new(ctx, SyslogServiceConfig::from_core(config))
        .context("failed to build syslog service")?;

    if cli.initialize_template() {
        service
            .initialize_templates()
            .await
            .context("failed to provision index templates")?;
        tracing::info!("index templates initialized");
        return Ok(());
    }

    let mut collector = service
        .bind()
        .await
        .context("failed to bind syslog listener")?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        bootstrap::shutdown_signal().await;
        shutdown.cancel();
    });

    service.serve(&mut collector, cancel).await;
    tracing::info!("logvane-syslogd shut down");
    Ok(())
}
