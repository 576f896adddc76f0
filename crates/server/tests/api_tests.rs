//! Integration tests for the triage API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use triage_lib::{
    backend::promql, flamebearer::FlamebearerProfile, Alert, Cutoffs, Diagnoser,
    HotspotClassifier, MetricsSource, ProfileKind, ProfileSource, Series, TimeWindow,
    TriageMetrics,
};
use triage_server::api::{create_router, AppState};

struct FixedMetrics {
    answers: HashMap<&'static str, Vec<(&'static str, f64)>>,
}

#[async_trait]
impl MetricsSource for FixedMetrics {
    fn endpoint(&self) -> &str {
        "http://prometheus.test/"
    }

    async fn vector_query(&self, expr: &str) -> triage_lib::Result<Vec<Series>> {
        let label = if expr == promql::SLOWEST_ROUTES { "route" } else { "service" };
        Ok(self
            .answers
            .get(expr)
            .map(|rows| rows.iter().map(|(k, v)| Series::new(&[(label, *k)], *v)).collect())
            .unwrap_or_default())
    }

    async fn firing_alerts(&self) -> triage_lib::Result<Vec<Alert>> {
        Ok(vec![Alert {
            name: "SlowCheckout".to_string(),
            severity: "critical".to_string(),
            instance: "checkout:8080".to_string(),
            summary: "p95 latency above 1s".to_string(),
            active_since: "2026-10-18T08:30:00Z".to_string(),
        }])
    }
}

struct FixedProfiles;

#[async_trait]
impl ProfileSource for FixedProfiles {
    fn endpoint(&self) -> &str {
        "http://pyroscope.test/"
    }

    async fn app_names(&self, _window: TimeWindow) -> triage_lib::Result<Vec<String>> {
        Ok(vec!["checkout".to_string(), "ledger".to_string()])
    }

    async fn render(
        &self,
        app: &str,
        kind: ProfileKind,
        _window: TimeWindow,
    ) -> triage_lib::Result<Option<FlamebearerProfile>> {
        if app != "checkout" || kind != ProfileKind::Cpu {
            return Ok(None);
        }
        Ok(Some(FlamebearerProfile {
            names: vec![
                "total".to_string(),
                "com/example/Checkout.total".to_string(),
                "java.util.HashMap.get".to_string(),
            ],
            levels: vec![vec![0, 100, 0, 0], vec![0, 60, 60, 1, 60, 40, 40, 2]],
            total_ticks: 100,
        }))
    }
}

fn setup_test_app() -> Router {
    let mut answers = HashMap::new();
    answers.insert(promql::JVM_UP, vec![("checkout", 1.0), ("ledger", 1.0)]);
    answers.insert(promql::CPU_RATE, vec![("checkout", 0.9), ("ledger", 0.05)]);
    answers.insert(promql::HEAP_USED, vec![("checkout", 300.0), ("ledger", 100.0)]);
    answers.insert(promql::HEAP_MAX, vec![("checkout", 1000.0), ("ledger", 1000.0)]);
    answers.insert(promql::THREADS, vec![("checkout", 30.0), ("ledger", 10.0)]);
    answers.insert(promql::REQUEST_RATE, vec![("checkout:8080", 20.0), ("ledger:8080", 4.0)]);
    answers.insert(promql::ERROR_RATE, vec![("checkout:8080", 0.2)]);
    answers.insert(promql::LATENCY_SUM, vec![("checkout:8080", 4.0), ("ledger:8080", 0.2)]);
    answers.insert(promql::LATENCY_COUNT, vec![("checkout:8080", 20.0), ("ledger:8080", 4.0)]);
    answers.insert(promql::SLOWEST_ROUTES, vec![("/pay", 0.5), ("/ping", 0.001)]);

    let diagnoser = Diagnoser::new(
        Some(Arc::new(FixedMetrics { answers })),
        Some(Arc::new(FixedProfiles)),
    );
    let state = Arc::new(AppState::new(
        diagnoser,
        Cutoffs::default(),
        HotspotClassifier::default(),
    ));
    create_router(state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_healthz_returns_ok() {
    let (status, body) = get_json(setup_test_app(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_health_report_orders_worst_first() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);

    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["service"], "checkout");
    assert_eq!(services[0]["status"], "CRITICAL");
    assert_eq!(services[1]["status"], "OK");
    assert_eq!(body["summary"]["total"], 2);
    assert_eq!(body["summary"]["critical"], 1);
}

#[tokio::test]
async fn test_bottlenecks_report() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/bottlenecks").await;
    assert_eq!(status, StatusCode::OK);

    let first = &body["services"][0];
    assert_eq!(first["service"], "checkout");
    assert_eq!(first["verdict"], "cpu-bound");
    assert_eq!(first["severity"], "critical");
    assert_eq!(first["primary_function"], "com.example.Checkout.total");
    assert_eq!(first["top_cpu"][0]["self_pct"], 60.0);
    assert_eq!(body["services"][1]["verdict"], "healthy");
    assert_eq!(body["thresholds"]["cpu"], 0.3);
}

#[tokio::test]
async fn test_bottlenecks_threshold_override_and_filter() {
    let (status, body) = get_json(
        setup_test_app(),
        "/api/v1/bottlenecks?service=checkout&thresholds=cpu%3D0.95",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["verdict"], "healthy");
    assert_eq!(body["thresholds"]["cpu"], 0.95);
}

#[tokio::test]
async fn test_bottlenecks_bad_threshold_is_400() {
    let (status, body) = get_json(
        setup_test_app(),
        "/api/v1/bottlenecks?thresholds=cpu%3Dhigh",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cpu"));
}

#[tokio::test]
async fn test_triage_defaults_to_cpu_and_alloc() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/triage/checkout").await;
    assert_eq!(status, StatusCode::OK);

    let profiles = body["profiles"].as_array().unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0]["kind"], "cpu");
    assert_eq!(profiles[0]["diagnosis"], "cpu_bound");
    assert_eq!(profiles[1]["diagnosis"], "no_data");
    assert_eq!(body["summary"]["impact"], "high");
}

#[tokio::test]
async fn test_unknown_profile_kind_is_400() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/triage/checkout?types=cpu,heap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("heap"));

    let (status, _) = get_json(setup_test_app(), "/api/v1/fleet/hotspots?type=disk").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fleet_hotspots() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/fleet/hotspots?type=cpu&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apps"].as_array().unwrap().len(), 2);

    let hotspots = body["hotspots"].as_array().unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0]["function"], "com.example.Checkout.total");
    assert_eq!(hotspots[0]["impact_score"], 60.0);
}

#[tokio::test]
async fn test_app_hotspots_and_missing_profile() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/hotspots/checkout").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_ticks"], 100);
    assert_eq!(body["categories"][0]["category"], "app");
    assert_eq!(body["top_app"][0]["function_name"], "com/example/Checkout.total");

    let (status, _) = get_json(setup_test_app(), "/api/v1/hotspots/ledger").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_diff_requires_baseline_window() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/diff/checkout").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("baseline_from"));

    let (status, body) = get_json(
        setup_test_app(),
        "/api/v1/diff/checkout?baseline_from=0&baseline_until=soon",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = get_json(
        setup_test_app(),
        "/api/v1/diff/checkout?baseline_from=0&baseline_until=60&from=60&until=120",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_query_parameter_is_json_400() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/fleet/hotspots?limit=many").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("query string"));
}

#[tokio::test]
async fn test_http_report() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/http").await;
    assert_eq!(status, StatusCode::OK);

    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["instance"], "checkout:8080");
    assert_eq!(services[0]["service"], "checkout");
    assert_eq!(services[0]["err_pct"], 1.0);
    assert_eq!(services[0]["avg_latency_ms"], 200.0);
    assert_eq!(body["slowest_endpoints"][0]["route"], "/pay");
    assert_eq!(body["slowest_endpoints"][1]["avg_latency_s"], 0.001);

    let (_, body) = get_json(setup_test_app(), "/api/v1/http?service=ledger").await;
    assert_eq!(body["services"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_alerts() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "SlowCheckout");
    assert_eq!(body[0]["active_since"], "2026-10-18T08:30:00Z");
}

#[tokio::test]
async fn test_profiles_per_service() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/profiles?service=checkout").await;
    assert_eq!(status, StatusCode::OK);

    let profiles = body.as_array().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["service"], "checkout");
    assert_eq!(profiles[0]["cpu_top5"][0]["function"], "com.example.Checkout.total");
    assert!(profiles[0]["mutex_top5"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_diagnose_sections() {
    let (status, body) = get_json(setup_test_app(), "/api/v1/diagnose?sections=health,alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"]["prometheus"], "http://prometheus.test/");
    assert_eq!(body["health"].as_array().unwrap().len(), 2);
    assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
    assert!(body.get("http").is_none());
    assert!(body.get("profiles").is_none());

    let (status, body) = get_json(setup_test_app(), "/api/v1/diagnose?service=ledger").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"][0]["service"], "ledger");
    assert_eq!(body["profiles"][0]["service"], "ledger");
    assert!(body["profiles"][0]["cpu_top5"].as_array().unwrap().is_empty());

    let (status, body) = get_json(setup_test_app(), "/api/v1/diagnose?sections=disk").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("disk"));
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let app = setup_test_app();
    let metrics = TriageMetrics::new();
    metrics.record_report("health", 2, 0.05);
    metrics.inc_backend_errors("prometheus");

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("jvm_triage_reports_total"));
    assert!(metrics_text.contains("jvm_triage_backend_errors_total"));
    assert!(metrics_text.contains("jvm_triage_report_duration_seconds_bucket"));
}
