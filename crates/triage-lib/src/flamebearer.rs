//! Flamebearer profile decoding
//!
//! A flamebearer profile stores sampled call stacks by depth. Each level is a
//! flat array of `(offset, total, self, name_index)` tuples, one per frame
//! recorded at that depth. Decoding sums the `self` column per function name
//! across every level, which yields self-time (time spent in the function
//! itself, excluding callees).

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Width of one frame tuple in a level array
const FRAME_TUPLE_LEN: usize = 4;

/// Raw stack-sample profile as returned by the render API
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlamebearerProfile {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub levels: Vec<Vec<i64>>,
    #[serde(rename = "numTicks", default)]
    pub total_ticks: u64,
}

/// Envelope of a render response; only the flamebearer object is used
#[derive(Debug, Deserialize)]
struct RenderResponse {
    flamebearer: Option<FlamebearerProfile>,
}

/// Parse a render response body
///
/// Returns `None` when the payload is not valid JSON or carries no
/// `flamebearer` object. Callers treat that as "no data".
pub fn parse_render(body: &str) -> Option<FlamebearerProfile> {
    match serde_json::from_str::<RenderResponse>(body) {
        Ok(response) => response.flamebearer,
        Err(e) => {
            debug!(error = %e, "Render payload is not a flamebearer document");
            None
        }
    }
}

/// Aggregated self-time per function name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelfTimes {
    values: HashMap<String, u64>,
    total_ticks: u64,
}

impl SelfTimes {
    /// Normalisation denominator for percentages
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn get(&self, function: &str) -> Option<u64> {
        self.values.get(function).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Percentage of all ticks attributed to `value`
    pub fn percent_of(&self, value: u64) -> f64 {
        if self.total_ticks == 0 {
            return 0.0;
        }
        value as f64 / self.total_ticks as f64 * 100.0
    }

    /// All functions ordered by self value, largest first, ties by name
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

/// Decode a profile into per-function self-time
///
/// Returns `None` when the profile has no ticks. Trailing partial tuples are
/// dropped, as are frames with a non-positive self value or a name index
/// outside `names`.
pub fn decode(profile: &FlamebearerProfile) -> Option<SelfTimes> {
    if profile.total_ticks == 0 {
        return None;
    }

    let mut values: HashMap<String, u64> = HashMap::new();

    for level in &profile.levels {
        for frame in level.chunks_exact(FRAME_TUPLE_LEN) {
            let self_value = frame[2];
            let name_index = frame[3];
            if self_value <= 0 {
                continue;
            }
            let Some(name) = usize::try_from(name_index)
                .ok()
                .and_then(|idx| profile.names.get(idx))
            else {
                continue;
            };
            let total = values.entry(name.clone()).or_insert(0);
            *total = total.saturating_add(self_value as u64);
        }
    }

    Some(SelfTimes {
        values,
        total_ticks: profile.total_ticks,
    })
}
