//! Prometheus metrics endpoint.
//!
//! Uses the built-in HTTP listener of `metrics-exporter-prometheus`;
//! scrapes are served on `/metrics` at `listen_addr:port`.

use std::net::SocketAddr;

use anyhow::Result;
use logvane_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Parse the configured listen address.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// Call once per process, from inside the tokio runtime.
///
/// # Errors
///
/// - invalid listen address
/// - socket binding fails or a recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    logvane_core::metrics::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_addr_parses() {
        let addr = listen_addr(&MetricsConfig::default()).unwrap();
        assert_eq!(addr.port(), 9464);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn bad_listen_addr_is_rejected() {
        let config = MetricsConfig {
            listen_addr: "not an ip".to_owned(),
            ..MetricsConfig::default()
        };
        assert!(listen_addr(&config).is_err());
    }
}
