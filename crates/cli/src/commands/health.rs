//! JVM health check command

use anyhow::{bail, Result};
use tabled::Tabled;
use triage_lib::{Diagnoser, ServiceHealth};

use crate::output::{self, format_mb, format_pct, OutputFormat};

/// Row for the health table
#[derive(Tabled)]
pub(crate) struct HealthRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Heap")]
    heap: String,
    #[tabled(rename = "GC")]
    gc: String,
    #[tabled(rename = "Threads")]
    threads: u64,
    #[tabled(rename = "Issues")]
    issues: String,
}

/// One table row per service, in report order
pub(crate) fn health_rows(services: &[ServiceHealth]) -> Vec<HealthRow> {
    services
        .iter()
        .map(|svc| HealthRow {
            service: svc.service.clone(),
            status: output::color_status(svc.status),
            cpu: format_pct(svc.metrics.cpu_rate),
            heap: format!(
                "{} ({} / {})",
                format_pct(svc.metrics.heap_pct),
                format_mb(svc.metrics.heap_used_mb),
                format_mb(svc.metrics.heap_max_mb)
            ),
            gc: format!("{:.3}s/s", svc.metrics.gc_rate),
            threads: svc.metrics.threads,
            issues: if svc.issues.is_empty() {
                "-".to_string()
            } else {
                svc.issues
                    .iter()
                    .map(|issue| issue.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            },
        })
        .collect()
}

/// Show JVM health of every service
pub async fn show_health(diagnoser: &Diagnoser, format: OutputFormat) -> Result<()> {
    let report = diagnoser.health_report().await;

    if report.services.is_empty() {
        bail!("No JVM metrics found. Is Prometheus scraping job=\"jvm\"?");
    }

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => {
            output::print_heading(&format!(
                "JVM Health ({})",
                report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ));

            output::print_table(health_rows(&report.services), "No services");
            output::print_summary(&report.summary);
        }
    }

    Ok(())
}
