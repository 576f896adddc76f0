//! Baseline versus current profile comparison command

use anyhow::{bail, Result};
use colored::Colorize;
use tabled::Tabled;
use triage_lib::diff::{short_name, DiffEntry};
use triage_lib::{Diagnoser, ProfileKind, TimeWindow};

use crate::output::{self, OutputFormat};

/// Windows and limits for one diff
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest {
    pub kind: ProfileKind,
    pub baseline_from: i64,
    pub baseline_until: i64,
    pub from: Option<i64>,
    pub until: Option<i64>,
    pub limit: usize,
}

/// Row for the diff table
#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Baseline")]
    baseline: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Delta")]
    delta: String,
}

impl From<&DiffEntry> for DiffRow {
    fn from(entry: &DiffEntry) -> Self {
        let delta = format!("{:+.2}", entry.delta);
        Self {
            function: short_name(&entry.function).to_string(),
            baseline: format!("{:.2}%", entry.baseline_pct),
            current: format!("{:.2}%", entry.current_pct),
            delta: if entry.delta > 0.0 {
                delta.red().to_string()
            } else {
                delta.green().to_string()
            },
        }
    }
}

/// Show the functions whose share changed between two windows
pub async fn show_diff(
    diagnoser: &Diagnoser,
    app: &str,
    request: &DiffRequest,
    format: OutputFormat,
) -> Result<()> {
    if request.baseline_from >= request.baseline_until {
        bail!("--baseline-from must be before --baseline-until");
    }

    let baseline = TimeWindow::new(request.baseline_from, request.baseline_until);
    let current = TimeWindow::resolve(request.from, request.until);
    let report = diagnoser
        .diff(app, request.kind, baseline, current, request.limit)
        .await;

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => {
            output::print_heading(&format!("Diff: {} ({})", app, request.kind));
            println!(
                "Baseline {} to {}, current {} to {}\n",
                output::format_epoch(baseline.from),
                output::format_epoch(baseline.until),
                output::format_epoch(current.from),
                output::format_epoch(current.until)
            );

            println!("{}", "Regressions".bold());
            output::print_table(
                report.regressions.iter().map(DiffRow::from).collect(),
                "No regressions",
            );

            println!("\n{}", "Improvements".bold());
            output::print_table(
                report.improvements.iter().map(DiffRow::from).collect(),
                "No improvements",
            );
        }
    }

    Ok(())
}
