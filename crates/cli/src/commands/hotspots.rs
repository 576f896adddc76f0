//! Offline hotspot ranking of a flamebearer render response

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use std::io::Read;
use std::path::Path;
use tabled::Tabled;
use tracing::debug;
use triage_lib::flamebearer::{self, SelfTimes};
use triage_lib::hotspot::{CategorySummary, FunctionSelfTime, HotspotReport};
use triage_lib::HotspotClassifier;

use crate::output::{self, truncate, OutputFormat};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Unit of the values in a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Unit {
    /// CPU samples in nanoseconds
    Samples,
    /// Allocated bytes
    Bytes,
    /// Event counts
    Count,
}

impl Unit {
    /// Render a raw profile value in this unit
    pub fn format(&self, value: u64) -> String {
        match self {
            Unit::Samples => format!("{:.2}s", value as f64 / NANOS_PER_SEC),
            Unit::Bytes => format!("{:.1}MB", value as f64 / BYTES_PER_MB),
            Unit::Count => format!("{} events", value),
        }
    }
}

/// Ranking options for the hotspots command
#[derive(Debug, Clone)]
pub struct HotspotOptions {
    pub top: usize,
    pub unit: Unit,
    pub app_prefix: String,
    pub user_code: bool,
    pub filter: Option<String>,
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Self")]
    self_value: String,
    #[tabled(rename = "Self %")]
    self_percent: String,
    #[tabled(rename = "Functions")]
    functions: usize,
}

#[derive(Tabled)]
struct FunctionRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Self")]
    self_value: String,
    #[tabled(rename = "Self %")]
    self_percent: String,
}

fn category_rows(categories: &[CategorySummary], unit: Unit) -> Vec<CategoryRow> {
    categories
        .iter()
        .map(|c| CategoryRow {
            category: c.category.to_string(),
            self_value: unit.format(c.self_value),
            self_percent: format!("{:.1}%", c.self_percent),
            functions: c.functions,
        })
        .collect()
}

fn function_rows(functions: &[FunctionSelfTime], unit: Unit) -> Vec<FunctionRow> {
    functions
        .iter()
        .enumerate()
        .map(|(i, f)| FunctionRow {
            rank: i + 1,
            function: truncate(&f.function_name, 70),
            category: f.category.to_string(),
            self_value: unit.format(f.self_value),
            self_percent: format!("{:.2}%", f.self_percent),
        })
        .collect()
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read stdin")?;
            Ok(body)
        }
    }
}

/// Decode a render response body into self-times
///
/// `None` when the body carries no flamebearer object or the profile has no
/// ticks; both mean there is no data to rank.
pub fn load_self_times(body: &str) -> Option<SelfTimes> {
    flamebearer::parse_render(body).and_then(|profile| flamebearer::decode(&profile))
}

/// Rank the hotspots of one render response
pub fn show_hotspots(file: Option<&Path>, options: &HotspotOptions, format: OutputFormat) -> Result<()> {
    let body = read_input(file)?;
    let classifier = HotspotClassifier::new(options.app_prefix.clone());
    let restricted_view = options.filter.is_some() || options.user_code;

    let Some(times) = load_self_times(&body) else {
        debug!(bytes = body.len(), "Render response has no profile samples");
        match format {
            OutputFormat::Json if restricted_view => output::print_json(&Vec::<FunctionSelfTime>::new())?,
            OutputFormat::Json => output::print_json(&HotspotReport::default())?,
            OutputFormat::Table => output::print_warning("No data (profile has no samples; generate load first)"),
        }
        return Ok(());
    };
    debug!(
        functions = times.len(),
        total_ticks = times.total_ticks(),
        app_prefix = %classifier.app_prefix(),
        "Decoded profile"
    );

    // A restricted ranking replaces the full breakdown
    let restricted = match (&options.filter, options.user_code) {
        (Some(prefix), _) => Some((
            format!("Functions matching '{}'", prefix),
            classifier.filter_prefix(&times, prefix, options.top),
        )),
        (None, true) => Some((
            format!("Application code ({})", classifier.app_prefix()),
            classifier.top_app(&times, options.top),
        )),
        (None, false) => None,
    };

    match (format, restricted) {
        (OutputFormat::Json, Some((_, functions))) => output::print_json(&functions)?,
        (OutputFormat::Json, None) => output::print_json(&classifier.report(&times, options.top))?,
        (OutputFormat::Table, Some((title, functions))) => {
            output::print_heading(&title);
            output::print_table(function_rows(&functions, options.unit), "No matching functions");
        }
        (OutputFormat::Table, None) => {
            let report = classifier.report(&times, options.top);
            output::print_heading(&format!(
                "Hotspots ({} functions, {} total)",
                report.functions,
                options.unit.format(report.total_ticks)
            ));

            println!("{}", "By category".bold());
            output::print_table(category_rows(&report.categories, options.unit), "No functions");

            println!("\n{}", format!("Top {}", options.top).bold());
            output::print_table(function_rows(&report.top, options.unit), "No functions");

            println!("\n{}", format!("Top {} application", options.top).bold());
            output::print_table(
                function_rows(&report.top_app, options.unit),
                &format!("No functions under {}", classifier.app_prefix()),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDER: &str = r#"{
        "flamebearer": {
            "names": ["total", "com/example/Api.handle", "java.lang.Thread.run"],
            "levels": [[0, 3000000000, 0, 0], [0, 2000000000, 2000000000, 1, 0, 1000000000, 1000000000, 2]],
            "numTicks": 3000000000
        }
    }"#;

    #[test]
    fn test_unit_format() {
        assert_eq!(Unit::Samples.format(1_500_000_000), "1.50s");
        assert_eq!(Unit::Bytes.format(3 * 1024 * 1024), "3.0MB");
        assert_eq!(Unit::Count.format(42), "42 events");
    }

    #[test]
    fn test_load_self_times() {
        let times = load_self_times(RENDER).unwrap();
        assert_eq!(times.total_ticks(), 3_000_000_000);
        assert_eq!(times.get("com/example/Api.handle"), Some(2_000_000_000));
    }

    #[test]
    fn test_load_without_samples_is_no_data() {
        assert!(load_self_times("not json").is_none());
        assert!(load_self_times(r#"{"metadata": {"units": "samples"}}"#).is_none());
        assert!(load_self_times(r#"{"flamebearer": {"names": [], "levels": [], "numTicks": 0}}"#).is_none());
    }

    #[test]
    fn test_function_rows_number_from_one() {
        let times = load_self_times(RENDER).unwrap();
        let classifier = HotspotClassifier::default();
        let rows = function_rows(&classifier.top(&times, 5), Unit::Samples);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].category, "app");
        assert_eq!(rows[0].self_value, "2.00s");
    }
}
