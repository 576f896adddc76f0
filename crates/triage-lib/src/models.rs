//! Core data models shared across the triage engine

use serde::{Deserialize, Serialize};

/// One entry of a top-N self-time list returned by a profiling backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFunction {
    pub function: String,
    pub self_pct: f64,
}

impl TopFunction {
    pub fn new(function: impl Into<String>, self_pct: f64) -> Self {
        Self {
            function: function.into(),
            self_pct,
        }
    }
}

/// Aggregate counts attached to every report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub healthy: usize,
}

/// Round to a fixed number of decimal places for presentation
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Divide, yielding 0 when the denominator is zero, negative or not finite
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}
