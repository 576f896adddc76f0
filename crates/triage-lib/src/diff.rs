//! Baseline versus current profile comparison

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::backend::{ProfileKind, TimeWindow};
use crate::models::{round_to, TopFunction};

/// Changes at or below this many percentage points are noise
pub const MIN_DELTA: f64 = 0.1;

/// Self-percent change of one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub function: String,
    pub baseline_pct: f64,
    pub current_pct: f64,
    pub delta: f64,
}

/// Function name to self percent
pub fn to_percent_map(functions: &[TopFunction]) -> HashMap<String, f64> {
    functions
        .iter()
        .map(|f| (f.function.clone(), f.self_pct))
        .collect()
}

/// Functions whose self percent moved, largest absolute change first
///
/// A function missing on one side counts as zero there.
pub fn compute_deltas(
    baseline: &HashMap<String, f64>,
    current: &HashMap<String, f64>,
    limit: usize,
) -> Vec<DiffEntry> {
    let names: BTreeSet<&String> = baseline.keys().chain(current.keys()).collect();

    let mut entries: Vec<DiffEntry> = names
        .into_iter()
        .filter_map(|name| {
            let before = baseline.get(name).copied().unwrap_or(0.0);
            let after = current.get(name).copied().unwrap_or(0.0);
            let delta = after - before;
            (delta.abs() > MIN_DELTA).then(|| DiffEntry {
                function: name.clone(),
                baseline_pct: before,
                current_pct: after,
                delta,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then_with(|| a.function.cmp(&b.function))
    });
    entries.truncate(limit);

    for entry in &mut entries {
        entry.baseline_pct = round_to(entry.baseline_pct, 2);
        entry.current_pct = round_to(entry.current_pct, 2);
        entry.delta = round_to(entry.delta, 2);
    }
    entries
}

/// Last two dot-separated segments, `Class.method` for a JVM frame
pub fn short_name(full_name: &str) -> &str {
    let Some(last_dot) = full_name.rfind('.') else {
        return full_name;
    };
    if last_dot == 0 {
        return full_name;
    }
    match full_name[..last_dot].rfind('.') {
        Some(prev) if prev > 0 => &full_name[prev + 1..],
        _ => full_name,
    }
}

/// Comparison of two windows for one application and profile type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub app: String,
    pub kind: ProfileKind,
    pub baseline: TimeWindow,
    pub current: TimeWindow,
    pub regressions: Vec<DiffEntry>,
    pub improvements: Vec<DiffEntry>,
    pub entries: Vec<DiffEntry>,
}

impl DiffReport {
    pub fn build(
        app: impl Into<String>,
        kind: ProfileKind,
        baseline_window: TimeWindow,
        current_window: TimeWindow,
        baseline: &[TopFunction],
        current: &[TopFunction],
        limit: usize,
    ) -> Self {
        let entries = compute_deltas(&to_percent_map(baseline), &to_percent_map(current), limit);
        let (regressions, improvements): (Vec<_>, Vec<_>) =
            entries.iter().cloned().partition(|e| e.delta > 0.0);

        Self {
            app: app.into(),
            kind,
            baseline: baseline_window,
            current: current_window,
            regressions,
            improvements,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_deltas_union_filter_and_order() {
        let baseline = map(&[("a.A.run", 10.0), ("b.B.run", 5.0), ("c.C.run", 3.0)]);
        let current = map(&[("a.A.run", 12.5), ("b.B.run", 5.05), ("d.D.run", 4.0)]);

        let deltas = compute_deltas(&baseline, &current, 10);
        let names: Vec<_> = deltas.iter().map(|d| d.function.as_str()).collect();
        assert_eq!(names, vec!["d.D.run", "c.C.run", "a.A.run"]);
        assert_eq!(deltas[0].baseline_pct, 0.0);
        assert_eq!(deltas[1].current_pct, 0.0);
        assert_eq!(deltas[1].delta, -3.0);
        assert_eq!(deltas[2].delta, 2.5);
    }

    #[test]
    fn test_ties_break_by_name_and_limit_applies() {
        let baseline = map(&[]);
        let current = map(&[("z", 1.0), ("y", 1.0), ("x", 2.0)]);
        let deltas = compute_deltas(&baseline, &current, 2);
        let names: Vec<_> = deltas.iter().map(|d| d.function.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("com.example.OrderService.process"), "OrderService.process");
        assert_eq!(short_name("Foo.bar"), "Foo.bar");
        assert_eq!(short_name("main"), "main");
        assert_eq!(short_name(".a.b"), ".a.b");
    }

    #[test]
    fn test_report_partitions_by_sign() {
        let report = DiffReport::build(
            "orders",
            ProfileKind::Cpu,
            TimeWindow::new(0, 10),
            TimeWindow::new(10, 20),
            &[TopFunction::new("a", 10.0), TopFunction::new("b", 10.0)],
            &[TopFunction::new("a", 15.0), TopFunction::new("b", 8.0)],
            10,
        );
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.regressions[0].function, "a");
        assert_eq!(report.improvements[0].function, "b");
    }
}
