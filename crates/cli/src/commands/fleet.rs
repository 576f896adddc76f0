//! Fleet-wide hotspot command

use anyhow::Result;
use tabled::Tabled;
use triage_lib::{Diagnoser, ProfileKind, TimeWindow};

use crate::output::{self, truncate, OutputFormat};

/// Row for the fleet hotspot table
#[derive(Tabled)]
struct FleetRow {
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Services")]
    service_count: usize,
    #[tabled(rename = "Max %")]
    max_self_percent: String,
    #[tabled(rename = "Impact")]
    impact_score: String,
    #[tabled(rename = "Apps")]
    apps: String,
}

/// Show the functions that are hot across the most services
pub async fn show_fleet(
    diagnoser: &Diagnoser,
    kind: ProfileKind,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let report = diagnoser
        .fleet_hotspots(kind, limit, TimeWindow::last_hour())
        .await;

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => {
            output::print_heading(&format!(
                "Fleet Hotspots ({}, {} services)",
                kind,
                report.apps.len()
            ));

            let rows: Vec<FleetRow> = report
                .hotspots
                .iter()
                .map(|h| FleetRow {
                    function: truncate(&h.function, 60),
                    service_count: h.service_count,
                    max_self_percent: format!("{:.2}%", h.max_self_percent),
                    impact_score: format!("{:.2}", h.impact_score),
                    apps: h
                        .services
                        .iter()
                        .map(|s| s.app.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect();

            output::print_table(rows, "No profile data found for any service");
        }
    }

    Ok(())
}
