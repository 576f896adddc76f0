//! Bottleneck classification command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;
use triage_lib::{investigate_hint, Cutoffs, Diagnoser, TopFunction, Verdict};

use crate::output::{self, format_pct, truncate, OutputFormat};

/// Row for the bottleneck table
#[derive(Tabled)]
struct BottleneckRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Heap")]
    heap: String,
    #[tabled(rename = "GC")]
    gc: String,
    #[tabled(rename = "Req/s")]
    req_per_sec: String,
    #[tabled(rename = "Err")]
    err_pct: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Top CPU")]
    top_cpu: String,
}

fn first_function(functions: &[TopFunction]) -> String {
    functions
        .first()
        .map(|f| format!("{} ({:.1}%)", truncate(&f.function, 40), f.self_pct))
        .unwrap_or_else(|| "-".to_string())
}

/// Show one verdict per service
pub async fn show_bottlenecks(
    diagnoser: &Diagnoser,
    cutoffs: Cutoffs,
    service: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let report = diagnoser.bottleneck_report(cutoffs, service).await;

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Table => {
            output::print_heading(&format!(
                "JVM Bottlenecks ({})",
                report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            println!(
                "Cutoffs: cpu={} heap_pct={} gc={} threads={} err_pct={} latency_ms={}\n",
                report.thresholds.cpu,
                report.thresholds.heap_pct,
                report.thresholds.gc,
                report.thresholds.threads,
                report.thresholds.err_pct,
                report.thresholds.latency_ms
            );

            let rows: Vec<BottleneckRow> = report
                .services
                .iter()
                .map(|v| BottleneckRow {
                    service: v.service.clone(),
                    verdict: output::color_verdict(v.verdict),
                    severity: output::color_severity(v.severity),
                    cpu: format_pct(v.metrics.cpu_rate),
                    heap: format_pct(v.metrics.heap_pct),
                    gc: format!("{:.3}s/s", v.metrics.gc_rate),
                    req_per_sec: format!("{:.1}", v.metrics.req_per_sec),
                    err_pct: format!("{:.1}%", v.metrics.err_pct),
                    latency: format!("{:.0}ms", v.metrics.avg_latency_ms),
                    top_cpu: first_function(&v.top_cpu),
                })
                .collect();

            let empty = match service {
                Some(name) => format!("No JVM service matches '{}'", name),
                None => "No JVM services found".to_string(),
            };
            output::print_table(rows, &empty);

            let flagged: Vec<_> = report
                .services
                .iter()
                .filter(|v| v.verdict != Verdict::Healthy)
                .collect();
            if !flagged.is_empty() {
                println!("\n{}", "Actions".bold());
                println!("{}", "-".repeat(60));
                for v in flagged {
                    println!("{} {}", v.service.cyan().bold(), output::color_verdict(v.verdict));
                    println!("  {}", v.action);
                    if !v.top_alloc.is_empty() {
                        println!("  Top alloc: {}", first_function(&v.top_alloc));
                    }
                    if !v.top_mutex.is_empty() {
                        println!("  Top lock:  {}", first_function(&v.top_mutex));
                    }
                    println!("  {}", investigate_hint(&v.profiling_name).dimmed());
                }
            }

            output::print_summary(&report.summary);
        }
    }

    Ok(())
}
