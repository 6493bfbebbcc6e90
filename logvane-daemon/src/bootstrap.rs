//! Startup wiring shared by both binaries.
//!
//! Builds the explicit ingestion context once: store client (pinged),
//! GeoIP readers and the local time zone. Every failure here is fatal
//! and carries enough context to tell which collaborator was unreachable.

use std::sync::Arc;

use anyhow::{Context, Result};

use logvane_core::config::{GeoIpConfig, LogvaneConfig};
use logvane_core::store::DocumentStore;
use logvane_log_pipeline::{ElasticsearchStore, GeoEnricher, IngestContext, MaxMindLookup};

use crate::metrics_server;

/// Install the Prometheus recorder when metrics are enabled.
pub fn install_metrics(config: &LogvaneConfig) -> Result<()> {
    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }
    Ok(())
}

/// Create the HTTP store client and verify the store is reachable.
pub async fn connect_store(config: &LogvaneConfig) -> Result<ElasticsearchStore> {
    let store = ElasticsearchStore::new(&config.store)
        .with_context(|| format!("failed to create store client for {}", config.store.url))?;
    store
        .ping()
        .await
        .with_context(|| format!("document store {} is unreachable", config.store.url))?;
    tracing::info!(url = %config.store.url, "document store reachable");
    Ok(store)
}

/// Open the GeoIP reference databases, or disable enrichment.
pub fn open_geo(config: &GeoIpConfig) -> Result<GeoEnricher> {
    if !config.enabled {
        tracing::info!("geo enrichment disabled in configuration");
        return Ok(GeoEnricher::disabled());
    }
    let lookup = MaxMindLookup::open(&config.asn_db, &config.city_db)
        .context("failed to open GeoIP reference databases")?;
    tracing::info!(asn_db = %config.asn_db, city_db = %config.city_db, "GeoIP databases loaded");
    Ok(GeoEnricher::new(Arc::new(lookup)))
}

/// Build the ingestion context for a production run.
pub async fn build_context(config: &LogvaneConfig) -> Result<IngestContext<ElasticsearchStore>> {
    let geo = open_geo(&config.geoip)?;
    let store = connect_store(config).await?;
    Ok(IngestContext::new(store, geo).with_legacy_types(config.store.include_type_name))
}

/// Resolve when Ctrl-C (or SIGTERM on unix) is received.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_geo_needs_no_databases() {
        let config = GeoIpConfig {
            enabled: false,
            asn_db: "/nonexistent/asn.mmdb".to_owned(),
            city_db: "/nonexistent/city.mmdb".to_owned(),
        };
        assert!(!open_geo(&config).unwrap().is_enabled());
    }

    #[test]
    fn missing_geo_database_is_fatal() {
        let config = GeoIpConfig {
            enabled: true,
            asn_db: "/nonexistent/asn.mmdb".to_owned(),
            city_db: "/nonexistent/city.mmdb".to_owned(),
        };
        let err = open_geo(&config).unwrap_err();
        assert!(format!("{err:#}").contains("GeoIP"));
    }

    #[tokio::test]
    async fn unreachable_store_is_fatal() {
        let mut config = LogvaneConfig::default();
        config.store.url = "http://127.0.0.1:1".to_owned();
        config.store.timeout_secs = 2;
        let err = connect_store(&config).await.unwrap_err();
        assert!(format!("{err:#}").contains("unreachable"));
    }
}
