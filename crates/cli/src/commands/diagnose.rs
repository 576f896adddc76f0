//! Combined diagnosis command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;
use triage_lib::diagnosis::{HttpReport, ServiceProfiles};
use triage_lib::{Alert, Diagnoser, Section, TopFunction};

use crate::commands::health::health_rows;
use crate::output::{self, truncate, OutputFormat};

/// Slowest routes printed in the table view
const ROUTES_SHOWN: usize = 5;
/// Functions printed per profile type in the table view
const FUNCTIONS_SHOWN: usize = 3;

#[derive(Tabled)]
struct HttpRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Req/s")]
    req_per_sec: String,
    #[tabled(rename = "Err/s")]
    err_per_sec: String,
    #[tabled(rename = "Err %")]
    err_pct: String,
    #[tabled(rename = "Avg Latency")]
    avg_latency: String,
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Alert")]
    name: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Since")]
    active_since: String,
}

fn color_alert_severity(severity: &str) -> String {
    match severity {
        "critical" => severity.red().bold().to_string(),
        "warning" => severity.yellow().to_string(),
        _ => severity.to_string(),
    }
}

/// `name (pct%)` for the first few functions, with a count of the rest
fn top_line(functions: &[TopFunction]) -> String {
    if functions.is_empty() {
        return "-".dimmed().to_string();
    }
    let mut line = functions
        .iter()
        .take(FUNCTIONS_SHOWN)
        .map(|f| format!("{} ({:.1}%)", truncate(&f.function, 50), f.self_pct))
        .collect::<Vec<_>>()
        .join(", ");
    if functions.len() > FUNCTIONS_SHOWN {
        line.push_str(&format!(" (+{} more)", functions.len() - FUNCTIONS_SHOWN));
    }
    line
}

fn print_http(http: &HttpReport) {
    let rows: Vec<HttpRow> = http
        .services
        .iter()
        .map(|s| HttpRow {
            instance: s.instance.clone(),
            req_per_sec: format!("{:.2}", s.req_per_sec),
            err_per_sec: format!("{:.4}", s.err_per_sec),
            err_pct: format!("{:.2}%", s.err_pct),
            avg_latency: format!("{:.1}ms", s.avg_latency_ms),
        })
        .collect();
    output::print_table(rows, "No HTTP metrics");

    if http.slowest_endpoints.is_empty() {
        return;
    }
    println!("\n{}", "Slowest endpoints".bold());
    for endpoint in http.slowest_endpoints.iter().take(ROUTES_SHOWN) {
        println!("  {:>10.1}ms  {}", endpoint.avg_latency_s * 1000.0, endpoint.route);
    }
}

fn print_profiles(profiles: &[ServiceProfiles]) {
    if profiles.is_empty() {
        output::print_warning("No profiled services");
        return;
    }
    for profile in profiles {
        println!("{}", profile.service.bold());
        println!("  cpu:    {}", top_line(&profile.cpu_top5));
        println!("  memory: {}", top_line(&profile.memory_top5));
        println!("  mutex:  {}", top_line(&profile.mutex_top5));
    }
}

fn print_alerts(alerts: &[Alert]) {
    let rows: Vec<AlertRow> = alerts
        .iter()
        .map(|a| AlertRow {
            name: a.name.clone(),
            severity: color_alert_severity(&a.severity),
            instance: a.instance.clone(),
            summary: truncate(&a.summary, 60),
            active_since: a.active_since.clone(),
        })
        .collect();
    output::print_table(rows, "(none)");
}

/// Show the requested sections of the combined diagnosis
pub async fn show_diagnosis(
    diagnoser: &Diagnoser,
    sections: &[Section],
    service: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let report = diagnoser.diagnose(sections, service).await;

    if format == OutputFormat::Json {
        return output::print_json(&report);
    }

    output::print_heading(&format!(
        "JVM Fleet Diagnosis ({})",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    println!(
        "Prometheus: {}",
        report.sources.prometheus.as_deref().unwrap_or("disabled")
    );
    println!(
        "Pyroscope:  {}",
        report.sources.pyroscope.as_deref().unwrap_or("disabled")
    );

    if let Some(health) = &report.health {
        println!("\n{}", "JVM health".bold());
        output::print_table(health_rows(health), "No JVM metrics");
    }
    if let Some(http) = &report.http {
        println!("\n{}", "HTTP traffic".bold());
        print_http(http);
    }
    if let Some(profiles) = &report.profiles {
        println!("\n{}", "Profile hotspots".bold());
        print_profiles(profiles);
    }
    if let Some(alerts) = &report.alerts {
        println!("\n{}", "Firing alerts".bold());
        print_alerts(alerts);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_line_counts_the_rest() {
        let functions: Vec<TopFunction> = (0..5)
            .map(|i| TopFunction::new(format!("com.example.F{}", i), 10.0 - i as f64))
            .collect();
        let line = top_line(&functions);
        assert!(line.starts_with("com.example.F0 (10.0%)"));
        assert!(line.contains("com.example.F2 (8.0%)"));
        assert!(!line.contains("F3"));
        assert!(line.ends_with("(+2 more)"));
    }

    #[test]
    fn test_top_line_short_list() {
        let line = top_line(&[TopFunction::new("a.B.c", 1.5)]);
        assert_eq!(line, "a.B.c (1.5%)");
    }

    #[test]
    fn test_alert_severity_passthrough() {
        assert_eq!(color_alert_severity("page"), "page");
    }
}
