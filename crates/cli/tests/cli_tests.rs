//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};

/// Run the CLI with a throwaway home directory so no user config is read
fn jvmt(args: &[&str]) -> Output {
    let home = tempfile::tempdir().expect("Failed to create temp home");
    Command::new("cargo")
        .args(["run", "-q", "-p", "triage-cli", "--"])
        .args(args)
        .env("HOME", home.path())
        .env_remove("PROMETHEUS_URL")
        .env_remove("PYROSCOPE_URL")
        .env_remove("JVMT_APP_PREFIX")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = jvmt(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Bottleneck triage"), "Should show about text");
    for command in ["health", "bottleneck", "hotspots", "triage", "diff", "fleet", "diagnose"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = jvmt(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("jvmt"), "Should show binary name");
}

/// Test global backend options
#[test]
fn test_backend_options() {
    let output = jvmt(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--prometheus-url"), "Should show prometheus-url option");
    assert!(stdout.contains("PROMETHEUS_URL"), "Should show env var");
    assert!(stdout.contains("--pyroscope-url"), "Should show pyroscope-url option");
    assert!(stdout.contains("--no-prometheus"), "Should show no-prometheus option");
    assert!(stdout.contains("--no-pyroscope"), "Should show no-pyroscope option");
}

/// Test format option
#[test]
fn test_format_option() {
    let output = jvmt(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test bottleneck subcommand help
#[test]
fn test_bottleneck_help() {
    let output = jvmt(&["bottleneck", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Bottleneck help should succeed");
    assert!(stdout.contains("--service"), "Should show service option");
    assert!(stdout.contains("--threshold"), "Should show threshold option");
}

/// Test hotspots subcommand help
#[test]
fn test_hotspots_help() {
    let output = jvmt(&["hotspots", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Hotspots help should succeed");
    assert!(stdout.contains("--unit"), "Should show unit option");
    assert!(stdout.contains("samples"), "Should show samples unit");
    assert!(stdout.contains("--user-code"), "Should show user-code option");
    assert!(stdout.contains("JVMT_APP_PREFIX"), "Should show app prefix env var");
}

/// Test diff subcommand requires a baseline window
#[test]
fn test_diff_requires_baseline() {
    let output = jvmt(&["diff", "checkout"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Diff without baseline should fail");
    assert!(stderr.contains("--baseline-from"), "Should name the missing option");
}

/// Test unknown profile types are rejected
#[test]
fn test_fleet_rejects_unknown_type() {
    let output = jvmt(&["--no-prometheus", "--no-pyroscope", "fleet", "--type", "disk"]);

    assert!(!output.status.success(), "Unknown profile type should fail");
}

/// Test health fails when no metrics are available
#[test]
fn test_health_without_metrics() {
    let output = jvmt(&["--no-prometheus", "--no-pyroscope", "health"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Health without metrics should fail");
    assert!(stderr.contains("No JVM metrics found"), "Should explain the failure");
}

/// Test triage degrades to no data without a profiling backend
#[test]
fn test_triage_without_profiles() {
    let output = jvmt(&[
        "--no-prometheus",
        "--no-pyroscope",
        "--format",
        "json",
        "triage",
        "checkout",
    ]);
    assert!(output.status.success(), "Triage should succeed");

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Triage output should be JSON");
    assert_eq!(report["app"], "checkout");
    assert_eq!(report["profiles"].as_array().unwrap().len(), 2);
    assert_eq!(report["profiles"][0]["diagnosis"], "no_data");
    assert_eq!(report["summary"]["primary_issue"], "healthy");
}

/// Test offline hotspot ranking of a render response file
#[test]
fn test_hotspots_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"flamebearer":{{"names":["total","com/example/Api.handle","org.apache.kafka.Client.poll"],"levels":[[0,10,0,0],[0,7,7,1,7,3,3,2]],"numTicks":10}}}}"#
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let output = jvmt(&["--format", "json", "hotspots", "--file", &path, "--top", "5"]);
    assert!(output.status.success(), "Hotspots should succeed");

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Hotspots output should be JSON");
    assert_eq!(report["total_ticks"], 10);
    assert_eq!(report["top"][0]["function_name"], "com/example/Api.handle");
    assert_eq!(report["top"][0]["category"], "app");
    assert_eq!(report["top"][1]["category"], "lib");
    assert_eq!(report["top_app"].as_array().unwrap().len(), 1);
}

/// Test a profile without samples reports no data instead of failing
#[test]
fn test_hotspots_zero_tick_profile() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"flamebearer":{{"names":["total"],"levels":[[0,0,0,0]],"numTicks":0}}}}"#
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let output = jvmt(&["hotspots", "--file", &path]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Empty profile should not fail");
    assert!(stdout.contains("No data"), "Should report no data");

    let output = jvmt(&["--format", "json", "hotspots", "--file", &path]);
    assert!(output.status.success(), "Empty profile should not fail in JSON mode");
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Hotspots output should be JSON");
    assert_eq!(report["total_ticks"], 0);
    assert!(report["top"].as_array().unwrap().is_empty());
}

/// Test a render response without a flamebearer object
#[test]
fn test_hotspots_without_flamebearer() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"metadata":{{"units":"samples"}}}}"#).unwrap();
    let path = file.path().to_string_lossy().to_string();

    let output = jvmt(&["--format", "json", "hotspots", "--file", &path, "--user-code"]);
    assert!(output.status.success(), "Missing flamebearer should not fail");
    let functions: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Hotspots output should be JSON");
    assert_eq!(functions, serde_json::json!([]));
}

/// Test diagnose subcommand help
#[test]
fn test_diagnose_help() {
    let output = jvmt(&["diagnose", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Diagnose help should succeed");
    assert!(stdout.contains("--section"), "Should show section option");
    assert!(stdout.contains("--service"), "Should show service option");
}

/// Test diagnose collects only the requested sections
#[test]
fn test_diagnose_offline_sections() {
    let output = jvmt(&[
        "--no-prometheus",
        "--no-pyroscope",
        "--format",
        "json",
        "diagnose",
        "--section",
        "http,alerts",
    ]);
    assert!(output.status.success(), "Diagnose should succeed");

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Diagnose output should be JSON");
    assert!(report["sources"]["prometheus"].is_null());
    assert!(report.get("health").is_none());
    assert!(report.get("profiles").is_none());
    assert!(report["http"]["services"].as_array().unwrap().is_empty());
    assert_eq!(report["alerts"], serde_json::json!([]));
}

/// Test diagnose rejects unknown sections
#[test]
fn test_diagnose_rejects_unknown_section() {
    let output = jvmt(&["--no-prometheus", "--no-pyroscope", "diagnose", "--section", "disk"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown section should fail");
    assert!(stderr.contains("disk"), "Should name the bad section");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = jvmt(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}
