//! Triage Server - JVM fleet bottleneck reports over HTTP
//!
//! Serves the health, bottleneck, triage, diff and fleet reports as JSON,
//! querying Prometheus and Pyroscope on every request.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triage_lib::{
    Diagnoser, HotspotClassifier, MetricsSource, ProfileSource, PrometheusClient, PyroscopeClient,
    StructuredLogger, TriageMetrics,
};
use triage_server::{api, config::ServerConfig};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting triage-server");

    let config = ServerConfig::load()?;
    let cutoffs = config.cutoffs()?;
    info!(
        prometheus_url = %config.prometheus_url,
        pyroscope_url = %config.pyroscope_url,
        app_prefix = %config.app_prefix,
        "Server configured"
    );

    let metrics: Option<Arc<dyn MetricsSource>> = if config.prometheus_url.is_empty() {
        None
    } else {
        Some(Arc::new(
            PrometheusClient::new(&config.prometheus_url).context("Invalid Prometheus URL")?,
        ))
    };
    let profiles: Option<Arc<dyn ProfileSource>> = if config.pyroscope_url.is_empty() {
        None
    } else {
        Some(Arc::new(
            PyroscopeClient::new(&config.pyroscope_url).context("Invalid Pyroscope URL")?,
        ))
    };

    // Register metrics before the first scrape
    let _metrics = TriageMetrics::new();

    let logger = StructuredLogger::new("triage-server");
    logger.log_startup(SERVER_VERSION, &format!("0.0.0.0:{}", config.port));

    let state = Arc::new(api::AppState::new(
        Diagnoser::new(metrics, profiles).with_service_map(config.service_map()),
        cutoffs,
        HotspotClassifier::new(config.app_prefix.clone()),
    ));

    let api_handle = tokio::spawn(api::serve(config.port, state));

    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
