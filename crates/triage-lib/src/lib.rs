//! Bottleneck triage for fleets of JVM services
//!
//! This crate provides the core functionality for:
//! - Decoding flamebearer profiles into per-function self-time
//! - Classifying hotspots as application, library or JVM code
//! - Evaluating JVM health against warn/crit bands
//! - Resolving one root-cause verdict per service from metrics and profiles
//! - Profile triage, diffs and fleet-wide hotspot ranking
//! - A combined diagnosis of health, HTTP traffic, profiles and alerts
//! - Prometheus and Pyroscope backends plus report assembly

pub mod backend;
pub mod bottleneck;
pub mod diagnosis;
pub mod diff;
pub mod error;
pub mod flamebearer;
pub mod fleet;
pub mod health;
pub mod hotspot;
pub mod models;
pub mod observability;
pub mod report;
pub mod service_map;
pub mod severity;
pub mod thresholds;
pub mod triage;

pub use backend::{
    Alert, MetricSnapshot, MetricsSource, ProfileKind, ProfileSource, PrometheusClient,
    PyroscopeClient, Series, TimeWindow,
};
pub use bottleneck::{investigate_hint, BottleneckResolver, BottleneckVerdict, Verdict};
pub use diagnosis::{DiagnosticReport, HttpReport, Section, ServiceProfiles};
pub use error::{Error, Result, ThresholdError};
pub use health::{JvmSample, ServiceHealth};
pub use hotspot::{Category, HotspotClassifier};
pub use models::*;
pub use observability::{StructuredLogger, TriageMetrics};
pub use report::{BottleneckReport, Diagnoser, HealthReport};
pub use service_map::ServiceMap;
pub use severity::Severity;
pub use thresholds::{Cutoffs, HealthThresholds};
