//! Threshold configuration
//!
//! Two shapes are used:
//! - [`HealthThresholds`]: a warn/crit [`Band`] per metric for the health check
//! - [`Cutoffs`]: a single line per metric for bottleneck signal detection,
//!   overridable from a `key=value` string

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ThresholdError;
use crate::severity::Severity;

/// Warning and critical lines for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub warn: f64,
    pub crit: f64,
}

impl Band {
    pub const fn new(warn: f64, crit: f64) -> Self {
        Self { warn, crit }
    }

    /// Level crossed by `value`, critical checked first
    pub fn level(&self, value: f64) -> Option<Severity> {
        if value >= self.crit {
            Some(Severity::Critical)
        } else if value >= self.warn {
            Some(Severity::Warning)
        } else {
            None
        }
    }
}

/// Bands for the per-service health check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthThresholds {
    pub cpu_rate: Band,
    pub heap_pct: Band,
    pub gc_rate: Band,
    pub threads: Band,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            cpu_rate: Band::new(0.5, 0.8),
            heap_pct: Band::new(0.70, 0.85),
            gc_rate: Band::new(0.03, 0.10),
            threads: Band::new(50.0, 100.0),
        }
    }
}

/// Single-line cutoffs for bottleneck signal detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cutoffs {
    pub cpu: f64,
    pub heap_pct: f64,
    pub gc: f64,
    pub threads: f64,
    pub err_pct: f64,
    pub latency_ms: f64,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self {
            cpu: 0.3,
            heap_pct: 0.75,
            gc: 0.03,
            threads: 60.0,
            err_pct: 2.0,
            latency_ms: 500.0,
        }
    }
}

impl Cutoffs {
    /// Apply whitespace-separated `key=value` overrides
    ///
    /// Tokens without `=` and unknown keys are ignored. A value that is not a
    /// number rejects the whole string.
    pub fn with_overrides(mut self, overrides: &str) -> Result<Self, ThresholdError> {
        for token in overrides.split_whitespace() {
            let Some((key, raw)) = token.split_once('=') else {
                continue;
            };
            let Some(slot) = self.slot_mut(key) else {
                continue;
            };
            *slot = raw.parse::<f64>().map_err(|_| ThresholdError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            })?;
        }
        Ok(self)
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut f64> {
        match key {
            "cpu" => Some(&mut self.cpu),
            "heap_pct" => Some(&mut self.heap_pct),
            "gc" => Some(&mut self.gc),
            "threads" => Some(&mut self.threads),
            "err_pct" => Some(&mut self.err_pct),
            "latency_ms" => Some(&mut self.latency_ms),
            _ => None,
        }
    }
}

impl FromStr for Cutoffs {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cutoffs::default().with_overrides(s)
    }
}
