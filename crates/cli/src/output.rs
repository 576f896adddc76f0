//! Output formatting utilities

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use triage_lib::{Severity, Summary, Verdict};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or a notice when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print the per-severity counts of a report
pub fn print_summary(summary: &Summary) {
    println!(
        "\n{} services: {} critical, {} warning, {} healthy",
        summary.total,
        summary.critical.to_string().red(),
        summary.warning.to_string().yellow(),
        summary.healthy.to_string().green()
    );
    if summary.critical == 0 && summary.warning == 0 && summary.total > 0 {
        print_success("All services healthy");
    }
}

/// Format a fraction as a percentage
pub fn format_pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Format megabytes
pub fn format_mb(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.2}Gi", mb / 1024.0)
    } else {
        format!("{:.1}Mi", mb)
    }
}

/// Color a severity in the health-check vocabulary
pub fn color_status(severity: Severity) -> String {
    let label = severity.as_upper_str();
    color_by_severity(severity, label)
}

/// Color a severity in the bottleneck vocabulary
pub fn color_severity(severity: Severity) -> String {
    color_by_severity(severity, severity.as_str())
}

fn color_by_severity(severity: Severity, label: &str) -> String {
    match severity {
        Severity::Critical => label.red().bold().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Ok => label.green().to_string(),
    }
}

/// Color a verdict name
pub fn color_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Healthy => verdict.as_str().green().to_string(),
        _ => verdict.as_str().yellow().bold().to_string(),
    }
}

/// Format epoch seconds as a UTC timestamp
pub fn format_epoch(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Shorten long function names for table cells
pub fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let tail: String = name
        .chars()
        .rev()
        .take(max.saturating_sub(3))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.853), "85.3%");
        assert_eq!(format_pct(0.0), "0.0%");
    }

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(512.0), "512.0Mi");
        assert_eq!(format_mb(2048.0), "2.00Gi");
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(0), "1970-01-01 00:00:00");
        assert_eq!(format_epoch(1_700_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("com.example.OrderService.process", 12), "...e.process");
    }
}
