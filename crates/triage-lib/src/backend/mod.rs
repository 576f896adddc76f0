//! Telemetry backends
//!
//! The classification core never talks to a backend directly. Reports are
//! assembled from two sources:
//! - [`MetricsSource`]: instant vector queries and firing alerts from a
//!   Prometheus-compatible API
//! - [`ProfileSource`]: flamebearer renders and application discovery from a
//!   Pyroscope-compatible API

mod prometheus;
mod pyroscope;

pub use self::prometheus::PrometheusClient;
pub use self::pyroscope::PyroscopeClient;

pub use async_trait::async_trait;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, Result};
use crate::flamebearer::{self, FlamebearerProfile};
use crate::hotspot::HotspotClassifier;
use crate::models::TopFunction;

/// PromQL expressions used by the health and bottleneck reports
pub mod promql {
    pub const JVM_UP: &str = r#"up{job="jvm"}"#;
    pub const CPU_RATE: &str = r#"rate(process_cpu_seconds_total{job="jvm"}[2m])"#;
    pub const HEAP_USED: &str = r#"jvm_memory_used_bytes{job="jvm", area="heap"}"#;
    pub const HEAP_MAX: &str = r#"jvm_memory_max_bytes{job="jvm", area="heap"}"#;
    pub const GC_RATE: &str = r#"rate(jvm_gc_collection_seconds_sum{job="jvm"}[2m])"#;
    pub const THREADS: &str = r#"jvm_threads_current{job="jvm"}"#;
    pub const REQUEST_RATE: &str =
        r#"sum by (instance) (rate(vertx_http_server_requests_total{job="vertx-apps"}[2m]))"#;
    pub const ERROR_RATE: &str = r#"sum by (instance) (rate(vertx_http_server_requests_total{job="vertx-apps", code=~"5.."}[2m]))"#;
    pub const LATENCY_SUM: &str = r#"sum by (instance) (rate(vertx_http_server_response_time_seconds_sum{job="vertx-apps"}[2m]))"#;
    pub const LATENCY_COUNT: &str = r#"sum by (instance) (rate(vertx_http_server_response_time_seconds_count{job="vertx-apps"}[2m]))"#;
    pub const SLOWEST_ROUTES: &str = r#"topk(10, sum by (route) (rate(vertx_http_server_response_time_seconds_sum{job="vertx-apps"}[5m])) / sum by (route) (rate(vertx_http_server_response_time_seconds_count{job="vertx-apps"}[5m])))"#;
}

/// Parse a backend base URL so that relative API paths extend its path
///
/// `http://gw/prom` becomes `http://gw/prom/`; without the trailing slash
/// `Url::join` would replace the last segment.
pub(crate) fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Labels tried in order to name the entity a series belongs to
const ENTITY_LABELS: &[&str] = &["service", "container", "instance"];

/// One series of an instant vector with all of its labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub labels: HashMap<String, String>,
    pub value: f64,
}

impl Series {
    pub fn new(labels: &[(&str, &str)], value: f64) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            value,
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Entity name: the `service`, `container` or `instance` label
    pub fn entity(&self) -> Option<&str> {
        ENTITY_LABELS.iter().find_map(|label| self.label(label))
    }
}

/// Alert currently firing in the metrics backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub name: String,
    pub severity: String,
    pub instance: String,
    pub summary: String,
    pub active_since: String,
}

/// Instant query result keyed by entity (service or instance)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot(HashMap<String, f64>);

impl MetricSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, zero when absent
    pub fn value(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    /// Value under the first key present, zero when none is
    pub fn first_of(&self, keys: &[&str]) -> f64 {
        keys.iter()
            .find_map(|k| self.0.get(*k).copied())
            .unwrap_or(0.0)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for MetricSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Profile types served by the profiling backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Cpu,
    Alloc,
    Mutex,
    Wall,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 4] = [
        ProfileKind::Cpu,
        ProfileKind::Alloc,
        ProfileKind::Mutex,
        ProfileKind::Wall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Cpu => "cpu",
            ProfileKind::Alloc => "alloc",
            ProfileKind::Mutex => "mutex",
            ProfileKind::Wall => "wall",
        }
    }

    /// Fully qualified profile type identifier
    pub fn profile_id(&self) -> &'static str {
        match self {
            ProfileKind::Cpu => "process_cpu:cpu:nanoseconds:cpu:nanoseconds",
            ProfileKind::Alloc => "memory:alloc_in_new_tlab_bytes:bytes:space:bytes",
            ProfileKind::Mutex => "mutex:contentions:count:mutex:count",
            ProfileKind::Wall => "wall:wall:nanoseconds:wall:nanoseconds",
        }
    }

    /// Render query selecting one application
    pub fn query_for(&self, app: &str) -> String {
        format!("{}{{service_name=\"{}\"}}", self.profile_id(), app)
    }

    /// Parse a comma-separated list such as `cpu,alloc`
    pub fn parse_list(list: &str) -> Result<Vec<ProfileKind>> {
        let mut kinds = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind: ProfileKind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(ProfileKind::Cpu),
            "alloc" | "allocation" | "memory" => Ok(ProfileKind::Alloc),
            "lock" | "mutex" | "contention" => Ok(ProfileKind::Mutex),
            "wall" | "wallclock" | "wall-clock" => Ok(ProfileKind::Wall),
            _ => Err(Error::UnknownProfileKind(s.to_string())),
        }
    }
}

/// Query window in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: i64,
    pub until: i64,
}

impl TimeWindow {
    /// Default lookback for profile queries
    pub const DEFAULT_LOOKBACK_SECS: i64 = 3600;

    pub fn new(from: i64, until: i64) -> Self {
        Self { from, until }
    }

    /// The last hour up to now
    pub fn last_hour() -> Self {
        let now = Utc::now().timestamp();
        Self::new(now - Self::DEFAULT_LOOKBACK_SECS, now)
    }

    /// Fill either bound from the default window
    pub fn resolve(from: Option<i64>, until: Option<i64>) -> Self {
        let default = Self::last_hour();
        Self::new(from.unwrap_or(default.from), until.unwrap_or(default.until))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::last_hour()
    }
}

/// Source of instant metric vectors and alerts
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Base URL or other description of the backend
    fn endpoint(&self) -> &str;

    /// Run an instant query, keeping every label
    async fn vector_query(&self, expr: &str) -> Result<Vec<Series>>;

    /// Alerts in the firing state
    async fn firing_alerts(&self) -> Result<Vec<Alert>>;

    /// Run an instant query, keyed by entity
    ///
    /// Series without an entity label are dropped; a later duplicate entity
    /// overwrites an earlier one.
    async fn instant_query(&self, expr: &str) -> Result<MetricSnapshot> {
        Ok(self
            .vector_query(expr)
            .await?
            .into_iter()
            .filter_map(|series| Some((series.entity()?.to_string(), series.value)))
            .collect())
    }
}

/// Source of stack-sample profiles
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Base URL or other description of the backend
    fn endpoint(&self) -> &str;

    /// Names of the applications with profiles in the window, sorted
    async fn app_names(&self, window: TimeWindow) -> Result<Vec<String>>;

    /// Fetch the flamebearer profile of one application, `None` when there is no data
    async fn render(
        &self,
        app: &str,
        kind: ProfileKind,
        window: TimeWindow,
    ) -> Result<Option<FlamebearerProfile>>;

    /// Top-N functions by self time, percent rounded to two decimals
    async fn top_functions(
        &self,
        app: &str,
        kind: ProfileKind,
        n: usize,
        window: TimeWindow,
    ) -> Result<Vec<TopFunction>> {
        let Some(profile) = self.render(app, kind, window).await? else {
            return Ok(Vec::new());
        };
        Ok(flamebearer::decode(&profile)
            .map(|times| HotspotClassifier::default().top_functions(&times, n))
            .unwrap_or_default())
    }
}
