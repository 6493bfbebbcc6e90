//! `logvane-tail`: one-shot W3C log tailing batch.
//!
//! Meant to be scheduled externally (cron, systemd timer). Each run
//! resumes from the checkpoint derived from the store.

use anyhow::{Context, Result};

use logvane_core::config::LogvaneConfig;
use logvane_daemon::bootstrap;
use logvane_daemon::cli::DaemonCli;
use logvane_daemon::logging::init_tracing;
use logvane_log_pipeline::{TailJob, TailJobConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse_as("logvane-tail");
    let config = cli.load_config().await?;
    init_tracing(&config.general)?;
    bootstrap::install_metrics(&config)?;

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(error = %format!("{e:#}"), "logvane-tail failed");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: &DaemonCli, config: &LogvaneConfig) -> Result<()> {
    let job_config = TailJobConfig::from_core(config).context("invalid tail configuration")?;
    tracing::info!(log_dir = %job_config.log_dir.display(), "logvane-tail starting");

    let ctx = bootstrap::build_context(config).await?;
    let mut job = TailJob::new(ctx, job_config).context("failed to build tail job")?;

    if cli.initialize_template() {
        let spec = job
            .initialize_template()
            .await
            .context("failed to provision index template")?;
        tracing::info!(
            template = %spec.name,
            fields = spec.field_types.len(),
            "index template initialized"
        );
        return Ok(());
    }

    let report = job.run().await.context("tail job failed")?;
    if report.summary.failed > 0 {
        tracing::warn!(failed = report.summary.failed, "some records were rejected by the store");
    }
    Ok(())
}
