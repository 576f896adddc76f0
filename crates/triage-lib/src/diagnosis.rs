//! Combined diagnostic report
//!
//! One report bundles up to four sections: JVM health, HTTP traffic (per
//! instance rates plus the slowest routes), per-service profile hotspots and
//! firing alerts. Which sections are collected is chosen by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::backend::{Alert, MetricSnapshot, Series};
use crate::error::{Error, Result};
use crate::health::ServiceHealth;
use crate::models::{ratio_or_zero, round_to, TopFunction};

/// Routes kept in the slowest-endpoint list
pub const SLOWEST_ENDPOINTS: usize = 10;
/// Functions kept per profile type in the profile section
pub const PROFILE_TOP_N: usize = 5;

/// Section of the combined report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Health,
    Http,
    Profiles,
    Alerts,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Health, Section::Http, Section::Profiles, Section::Alerts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Health => "health",
            Section::Http => "http",
            Section::Profiles => "profiles",
            Section::Alerts => "alerts",
        }
    }

    /// Parse a comma-separated list; `all` selects every section
    pub fn parse_list(list: &str) -> Result<Vec<Section>> {
        let mut sections = BTreeSet::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                sections.extend(Section::ALL);
            } else {
                sections.insert(part.parse::<Section>()?);
            }
        }
        if sections.is_empty() {
            sections.extend(Section::ALL);
        }
        Ok(sections.into_iter().collect())
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "health" => Ok(Section::Health),
            "http" => Ok(Section::Http),
            "profiles" => Ok(Section::Profiles),
            "alerts" => Ok(Section::Alerts),
            _ => Err(Error::UnknownSection(s.to_string())),
        }
    }
}

/// Request statistics of one HTTP instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpServiceStats {
    pub instance: String,
    pub service: String,
    pub req_per_sec: f64,
    pub err_per_sec: f64,
    pub err_pct: f64,
    pub avg_latency_ms: f64,
}

/// Average latency of one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowEndpoint {
    pub route: String,
    pub avg_latency_s: f64,
}

/// HTTP traffic section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpReport {
    pub services: Vec<HttpServiceStats>,
    pub slowest_endpoints: Vec<SlowEndpoint>,
}

/// Container part of an `host:port` instance name
pub fn instance_service(instance: &str) -> &str {
    instance.split(':').next().unwrap_or(instance)
}

/// Per-instance request statistics, sorted by instance
///
/// Instances are those with a request rate or a latency sum. With
/// `container` set, only instances of that container are kept.
pub fn http_stats(
    req_rate: &MetricSnapshot,
    err_rate: &MetricSnapshot,
    lat_sum: &MetricSnapshot,
    lat_count: &MetricSnapshot,
    container: Option<&str>,
) -> Vec<HttpServiceStats> {
    let instances: BTreeSet<&str> = req_rate.keys().chain(lat_sum.keys()).collect();

    instances
        .into_iter()
        .filter(|inst| container.map_or(true, |c| instance_service(inst) == c))
        .map(|inst| {
            let req = req_rate.value(inst);
            let err = err_rate.value(inst);
            let avg_latency_s = ratio_or_zero(lat_sum.value(inst), lat_count.value(inst));
            HttpServiceStats {
                instance: inst.to_string(),
                service: instance_service(inst).to_string(),
                req_per_sec: round_to(req, 2),
                err_per_sec: round_to(err, 4),
                err_pct: round_to(ratio_or_zero(err, req) * 100.0, 2),
                avg_latency_ms: round_to(avg_latency_s * 1000.0, 1),
            }
        })
        .collect()
}

/// Routes with a positive average latency, slowest first, ties by route
pub fn slowest_endpoints(series: &[Series], limit: usize) -> Vec<SlowEndpoint> {
    let mut endpoints: Vec<SlowEndpoint> = series
        .iter()
        .filter(|s| s.value > 0.0)
        .map(|s| SlowEndpoint {
            route: s.label("route").unwrap_or("unknown").to_string(),
            avg_latency_s: round_to(s.value, 4),
        })
        .collect();
    endpoints.sort_by(|a, b| {
        b.avg_latency_s
            .total_cmp(&a.avg_latency_s)
            .then_with(|| a.route.cmp(&b.route))
    });
    endpoints.truncate(limit);
    endpoints
}

/// Top functions of one profiled service per profile type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceProfiles {
    pub service: String,
    pub cpu_top5: Vec<TopFunction>,
    pub memory_top5: Vec<TopFunction>,
    pub mutex_top5: Vec<TopFunction>,
}

/// Backend endpoints, `None` when a backend is not configured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sources {
    pub prometheus: Option<String>,
    pub pyroscope: Option<String>,
}

/// Combined report; absent sections were not requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub timestamp: DateTime<Utc>,
    pub sources: Sources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<Vec<ServiceHealth>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<ServiceProfiles>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
}
