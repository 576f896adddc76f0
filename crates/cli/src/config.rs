//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use triage_lib::{Cutoffs, ServiceMap};

/// CLI configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Prometheus-compatible metrics API
    pub prometheus_url: Option<String>,
    /// Pyroscope-compatible profiling API
    pub pyroscope_url: Option<String>,
    /// Package prefix of application code
    pub app_prefix: Option<String>,
    /// Default bottleneck cutoff overrides
    pub thresholds: Option<String>,
    /// Container name to profiling name
    #[serde(default)]
    pub service_map: ServiceMap,
}

impl Config {
    /// Load configuration from the default file, empty when it does not exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("jvmt").join("config.json"))
    }

    /// Default cutoffs, then file overrides, then command-line overrides
    pub fn cutoffs(&self, flag_overrides: Option<&str>) -> Result<Cutoffs> {
        let mut cutoffs = Cutoffs::default();
        if let Some(file_overrides) = &self.thresholds {
            cutoffs = cutoffs
                .with_overrides(file_overrides)
                .context("Invalid thresholds in config file")?;
        }
        if let Some(flag_overrides) = flag_overrides {
            cutoffs = cutoffs
                .with_overrides(flag_overrides)
                .context("Invalid --threshold value")?;
        }
        Ok(cutoffs)
    }
}
