//! Cross-service hotspot ranking
//!
//! A function that is hot in many services is a better optimisation target
//! than one that is hot in a single service, so each function is scored by
//! how many services it appears in times its worst self percent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::backend::ProfileKind;
use crate::models::{round_to, TopFunction};

/// One service's share of a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceShare {
    pub app: String,
    pub self_pct: f64,
}

/// A function ranked across the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetHotspot {
    pub function: String,
    pub service_count: usize,
    pub max_self_percent: f64,
    pub impact_score: f64,
    pub services: Vec<ServiceShare>,
}

/// Group per-application top lists by function
pub fn group_by_function<'a, I>(per_app: I) -> BTreeMap<String, Vec<ServiceShare>>
where
    I: IntoIterator<Item = (&'a str, &'a [TopFunction])>,
{
    let mut grouped: BTreeMap<String, Vec<ServiceShare>> = BTreeMap::new();
    for (app, functions) in per_app {
        for f in functions {
            grouped.entry(f.function.clone()).or_default().push(ServiceShare {
                app: app.to_string(),
                self_pct: f.self_pct,
            });
        }
    }
    grouped
}

/// Rank functions by impact, highest first, ties by name
pub fn rank_hotspots(by_function: BTreeMap<String, Vec<ServiceShare>>, limit: usize) -> Vec<FleetHotspot> {
    let mut ranked: Vec<FleetHotspot> = by_function
        .into_iter()
        .map(|(function, services)| {
            let service_count = services.len();
            let max_self_percent = services.iter().map(|s| s.self_pct).fold(0.0, f64::max);
            FleetHotspot {
                function,
                service_count,
                max_self_percent,
                impact_score: service_count as f64 * max_self_percent,
                services,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.function.cmp(&b.function))
    });
    ranked.truncate(limit);

    for hotspot in &mut ranked {
        hotspot.max_self_percent = round_to(hotspot.max_self_percent, 2);
        hotspot.impact_score = round_to(hotspot.impact_score, 2);
    }
    ranked
}

/// Fleet-wide ranking for one profile type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    pub kind: ProfileKind,
    pub apps: Vec<String>,
    pub hotspots: Vec<FleetHotspot>,
}
