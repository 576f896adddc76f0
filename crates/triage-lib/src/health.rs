//! Per-service JVM health evaluation
//!
//! Each metric is checked on its own against a warn/crit band. Every crossed
//! metric contributes exactly one issue at the level it crossed, and the
//! service status is the worst issue level.

use serde::{Deserialize, Serialize};

use crate::models::{ratio_or_zero, round_to};
use crate::severity::{self, Severity, SeverityRanked};
use crate::thresholds::HealthThresholds;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Raw JVM metrics for one service, zero when a snapshot had no entry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JvmSample {
    pub cpu_rate: f64,
    pub heap_used: f64,
    pub heap_max: f64,
    pub gc_rate: f64,
    pub threads: f64,
}

impl JvmSample {
    /// Heap usage fraction, 0 when the maximum is unknown
    pub fn heap_pct(&self) -> f64 {
        ratio_or_zero(self.heap_used, self.heap_max)
    }
}

/// One metric crossing a band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(with = "severity::upper")]
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    fn new(severity: Severity, message: String) -> Self {
        Self { severity, message }
    }
}

/// Rounded metrics carried in a health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub cpu_rate: f64,
    pub heap_pct: f64,
    pub heap_used_mb: f64,
    pub heap_max_mb: f64,
    pub gc_rate: f64,
    pub threads: u64,
}

/// Health check result for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: String,
    pub profiling_name: String,
    #[serde(with = "severity::upper")]
    pub status: Severity,
    pub metrics: HealthMetrics,
    pub issues: Vec<Issue>,
}

impl SeverityRanked for ServiceHealth {
    fn severity(&self) -> Severity {
        self.status
    }

    fn identity(&self) -> &str {
        &self.service
    }
}

/// Worst level among the issues, `Ok` when there are none
pub fn overall_status(issues: &[Issue]) -> Severity {
    let mut has_warning = false;

    for issue in issues {
        match issue.severity {
            Severity::Critical => return Severity::Critical,
            Severity::Warning => has_warning = true,
            Severity::Ok => {}
        }
    }

    if has_warning {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Evaluate one service against the health bands
pub fn evaluate(
    service: &str,
    profiling_name: &str,
    sample: &JvmSample,
    thresholds: &HealthThresholds,
) -> ServiceHealth {
    let heap_pct = sample.heap_pct();
    let threads = sample.threads.max(0.0).trunc();
    let mut issues = Vec::new();

    let band = thresholds.cpu_rate;
    if let Some(level) = band.level(sample.cpu_rate) {
        let line = if level == Severity::Critical { band.crit } else { band.warn };
        issues.push(Issue::new(
            level,
            format!("CPU {:.1}% >= {:.0}%", sample.cpu_rate * 100.0, line * 100.0),
        ));
    }

    let band = thresholds.heap_pct;
    if let Some(level) = band.level(heap_pct) {
        let line = if level == Severity::Critical { band.crit } else { band.warn };
        issues.push(Issue::new(
            level,
            format!("Heap {:.1}% >= {:.0}%", heap_pct * 100.0, line * 100.0),
        ));
    }

    let band = thresholds.gc_rate;
    if let Some(level) = band.level(sample.gc_rate) {
        let line = if level == Severity::Critical { band.crit } else { band.warn };
        issues.push(Issue::new(
            level,
            format!("GC {:.3}s/s >= {}s/s", sample.gc_rate, line),
        ));
    }

    let band = thresholds.threads;
    if let Some(level) = band.level(sample.threads) {
        let line = if level == Severity::Critical { band.crit } else { band.warn };
        issues.push(Issue::new(level, format!("Threads {} >= {}", threads, line)));
    }

    ServiceHealth {
        service: service.to_string(),
        profiling_name: profiling_name.to_string(),
        status: overall_status(&issues),
        metrics: HealthMetrics {
            cpu_rate: round_to(sample.cpu_rate, 3),
            heap_pct: round_to(heap_pct, 3),
            heap_used_mb: round_to(sample.heap_used / BYTES_PER_MB, 1),
            heap_max_mb: round_to(sample.heap_max / BYTES_PER_MB, 1),
            gc_rate: round_to(sample.gc_rate, 4),
            threads: threads as u64,
        },
        issues,
    }
}
