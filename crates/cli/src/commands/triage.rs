//! Profile-only triage command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;
use triage_lib::triage::Diagnosis;
use triage_lib::{Diagnoser, ProfileKind, TimeWindow};

use crate::output::{self, truncate, OutputFormat};

/// Row for the per-profile table
#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Diagnosis")]
    diagnosis: String,
    #[tabled(rename = "Top Function")]
    top_function: String,
    #[tabled(rename = "Self %")]
    self_pct: String,
}

fn color_diagnosis(diagnosis: Diagnosis) -> String {
    match diagnosis {
        Diagnosis::Healthy => diagnosis.as_str().green().to_string(),
        Diagnosis::NoData | Diagnosis::Unavailable => diagnosis.as_str().dimmed().to_string(),
        _ => diagnosis.as_str().yellow().bold().to_string(),
    }
}

/// Show the triage of one application
pub async fn show_triage(
    diagnoser: &Diagnoser,
    app: &str,
    kinds: &[ProfileKind],
    limit: usize,
    from: Option<i64>,
    until: Option<i64>,
    format: OutputFormat,
) -> Result<()> {
    let window = TimeWindow::resolve(from, until);
    let report = diagnoser.triage(app, kinds, limit, window).await;

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => {
            output::print_heading(&format!(
                "Triage: {} ({} to {} UTC)",
                app,
                output::format_epoch(report.from),
                output::format_epoch(report.until)
            ));

            let rows: Vec<ProfileRow> = report
                .profiles
                .iter()
                .map(|p| {
                    let top = p.top_functions.first();
                    ProfileRow {
                        kind: p.kind.to_string(),
                        diagnosis: color_diagnosis(p.diagnosis),
                        top_function: top
                            .map(|f| truncate(&f.function, 50))
                            .unwrap_or_else(|| "-".to_string()),
                        self_pct: top
                            .map(|f| format!("{:.1}%", f.self_pct))
                            .unwrap_or_else(|| "-".to_string()),
                    }
                })
                .collect();
            output::print_table(rows, "No profile types requested");

            for p in &report.profiles {
                if let Some(error) = &p.error {
                    output::print_warning(&format!("{}: {}", p.kind, error));
                }
            }

            println!();
            println!(
                "Primary issue: {} (impact: {})",
                color_diagnosis(report.summary.primary_issue),
                report.summary.impact
            );
            output::print_info(&report.summary.recommendation);
        }
    }

    Ok(())
}
