//! Observability for the triage engine
//!
//! Provides:
//! - Prometheus metrics (reports produced, services evaluated, backend errors, report latency)
//! - Structured logging with named `event` fields

use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for report assembly time (in seconds)
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<TriageMetricsInner> = OnceLock::new();

struct TriageMetricsInner {
    reports_total: IntCounterVec,
    services_evaluated: IntGauge,
    backend_errors_total: IntCounterVec,
    report_duration_seconds: Histogram,
}

impl TriageMetricsInner {
    fn new() -> Self {
        Self {
            reports_total: register_int_counter_vec!(
                "jvm_triage_reports_total",
                "Reports produced, by report type",
                &["report"]
            )
            .expect("Failed to register reports_total"),

            services_evaluated: register_int_gauge!(
                "jvm_triage_services_evaluated",
                "Services evaluated by the most recent report"
            )
            .expect("Failed to register services_evaluated"),

            backend_errors_total: register_int_counter_vec!(
                "jvm_triage_backend_errors_total",
                "Backend queries that failed and were degraded to empty data",
                &["backend"]
            )
            .expect("Failed to register backend_errors_total"),

            report_duration_seconds: register_histogram!(
                "jvm_triage_report_duration_seconds",
                "Time spent querying backends and assembling a report",
                DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register report_duration_seconds"),
        }
    }
}

/// Handle to the global triage metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct TriageMetrics {
    _private: (),
}

impl Default for TriageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TriageMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(TriageMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &TriageMetricsInner {
        GLOBAL_METRICS.get_or_init(TriageMetricsInner::new)
    }

    /// Record one finished report
    pub fn record_report(&self, report: &str, services: usize, duration_secs: f64) {
        let inner = self.inner();
        inner.reports_total.with_label_values(&[report]).inc();
        inner.services_evaluated.set(services as i64);
        inner.report_duration_seconds.observe(duration_secs);
    }

    pub fn inc_backend_errors(&self, backend: &str) {
        self.inner().backend_errors_total.with_label_values(&[backend]).inc();
    }

    pub fn reports_total(&self, report: &str) -> u64 {
        self.inner().reports_total.with_label_values(&[report]).get()
    }

    pub fn backend_errors(&self, backend: &str) -> u64 {
        self.inner().backend_errors_total.with_label_values(&[backend]).get()
    }
}

/// Structured logger for triage events
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Log a finished report
    pub fn log_analysis(&self, report: &str, services: usize, critical: usize, warning: usize, duration_ms: u64) {
        info!(
            event = "analysis_completed",
            component = %self.component,
            report = %report,
            services = services,
            critical = critical,
            warning = warning,
            duration_ms = duration_ms,
            "Analysis completed"
        );
    }

    /// Log a backend query that failed and was replaced by empty data
    pub fn log_backend_degraded(&self, backend: &str, query: &str, error: &str) {
        warn!(
            event = "backend_degraded",
            component = %self.component,
            backend = %backend,
            query = %query,
            error = %error,
            "Backend query failed, continuing with empty data"
        );
    }

    pub fn log_startup(&self, version: &str, listen_addr: &str) {
        info!(
            event = "server_started",
            component = %self.component,
            version = %version,
            listen_addr = %listen_addr,
            "Triage server started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            component = %self.component,
            reason = %reason,
            "Triage server shutting down"
        );
    }
}
