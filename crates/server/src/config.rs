//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use triage_lib::{Cutoffs, ServiceMap};

/// Server configuration, read from `TRIAGE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prometheus-compatible metrics API; empty disables the backend
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    /// Pyroscope-compatible profiling API; empty disables the backend
    #[serde(default = "default_pyroscope_url")]
    pub pyroscope_url: String,

    /// Package prefix of application code
    #[serde(default = "default_app_prefix")]
    pub app_prefix: String,

    /// Default bottleneck cutoff overrides, `key=value` separated by spaces
    #[serde(default)]
    pub thresholds: String,

    /// Container to profiling name pairs, `container=app` separated by commas
    #[serde(default)]
    pub service_map: String,
}

fn default_port() -> u16 {
    8080
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_pyroscope_url() -> String {
    "http://localhost:4040".to_string()
}

fn default_app_prefix() -> String {
    triage_lib::hotspot::DEFAULT_APP_PREFIX.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            prometheus_url: default_prometheus_url(),
            pyroscope_url: default_pyroscope_url(),
            app_prefix: default_app_prefix(),
            thresholds: String::new(),
            service_map: String::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TRIAGE"))
            .build()?;

        config
            .try_deserialize()
            .context("Invalid TRIAGE_* configuration")
    }

    /// Default cutoffs with the configured overrides applied
    pub fn cutoffs(&self) -> Result<Cutoffs> {
        self.thresholds
            .parse()
            .with_context(|| format!("Invalid TRIAGE_THRESHOLDS '{}'", self.thresholds))
    }

    /// Parse the configured service map; entries without `=` are skipped
    pub fn service_map(&self) -> ServiceMap {
        self.service_map
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(service, app)| (service.trim(), app.trim()))
            .filter(|(service, app)| !service.is_empty() && !app.is_empty())
            .collect()
    }
}
