//! HTTP API for triage reports and Prometheus metrics

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use triage_lib::{Cutoffs, Diagnoser, HotspotClassifier, ProfileKind, Section, TimeWindow};

const DEFAULT_TRIAGE_TYPES: &str = "cpu,alloc";
const DEFAULT_TRIAGE_LIMIT: usize = 10;
const DEFAULT_FLEET_LIMIT: usize = 20;
const DEFAULT_HOTSPOT_TOP: usize = 20;
const DEFAULT_DIFF_LIMIT: usize = 20;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub diagnoser: Arc<Diagnoser>,
    pub cutoffs: Cutoffs,
    pub classifier: HotspotClassifier,
}

impl AppState {
    pub fn new(diagnoser: Diagnoser, cutoffs: Cutoffs, classifier: HotspotClassifier) -> Self {
        Self {
            diagnoser: Arc::new(diagnoser),
            cutoffs,
            classifier,
        }
    }
}

/// Request error rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<triage_lib::Error> for ApiError {
    fn from(e: triage_lib::Error) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn parse_kind(raw: Option<&str>) -> Result<ProfileKind, ApiError> {
    Ok(raw.unwrap_or("cpu").parse::<ProfileKind>()?)
}

#[derive(Debug, Deserialize)]
pub struct BottleneckParams {
    pub service: Option<String>,
    pub thresholds: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriageParams {
    pub types: Option<String>,
    pub limit: Option<usize>,
    pub from: Option<i64>,
    pub until: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<usize>,
    pub from: Option<i64>,
    pub until: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceParams {
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfilesParams {
    pub service: Option<String>,
    pub from: Option<i64>,
    pub until: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseParams {
    pub sections: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiffParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub baseline_from: i64,
    pub baseline_until: i64,
    pub from: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<usize>,
}

/// Liveness check
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn health_report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.diagnoser.health_report().await)
}

async fn bottlenecks(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BottleneckParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let cutoffs = match params.thresholds.as_deref() {
        Some(overrides) => state
            .cutoffs
            .with_overrides(overrides)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => state.cutoffs,
    };

    let service = params.service.as_deref().filter(|s| !s.is_empty());
    Ok(Json(state.diagnoser.bottleneck_report(cutoffs, service).await))
}

async fn triage(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
    query: Result<Query<TriageParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let types = params
        .types
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_TRIAGE_TYPES);
    let kinds = ProfileKind::parse_list(types)?;
    let window = TimeWindow::resolve(params.from, params.until);
    let limit = params.limit.unwrap_or(DEFAULT_TRIAGE_LIMIT);

    Ok(Json(state.diagnoser.triage(&app, &kinds, limit, window).await))
}

async fn diff(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
    query: Result<Query<DiffParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let kind = parse_kind(params.kind.as_deref())?;
    let baseline = TimeWindow::new(params.baseline_from, params.baseline_until);
    let current = TimeWindow::resolve(params.from, params.until);
    let limit = params.limit.unwrap_or(DEFAULT_DIFF_LIMIT);

    Ok(Json(
        state
            .diagnoser
            .diff(&app, kind, baseline, current, limit)
            .await,
    ))
}

async fn fleet_hotspots(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProfileParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let kind = parse_kind(params.kind.as_deref())?;
    let window = TimeWindow::resolve(params.from, params.until);
    let limit = params.limit.unwrap_or(DEFAULT_FLEET_LIMIT);

    Ok(Json(state.diagnoser.fleet_hotspots(kind, limit, window).await))
}

async fn app_hotspots(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
    query: Result<Query<ProfileParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let kind = parse_kind(params.kind.as_deref())?;
    let window = TimeWindow::resolve(params.from, params.until);
    let top = params.limit.unwrap_or(DEFAULT_HOTSPOT_TOP);

    let report = state
        .diagnoser
        .hotspots(&app, kind, &state.classifier, top, window)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no {} profile data for {}", kind, app)))?;
    Ok(Json(report))
}

async fn http_report(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ServiceParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let service = params.service.as_deref().filter(|s| !s.is_empty());
    Ok(Json(state.diagnoser.http_report(service).await))
}

async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.diagnoser.alerts_report().await)
}

async fn profiles(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProfilesParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let service = params.service.as_deref().filter(|s| !s.is_empty());
    let window = TimeWindow::resolve(params.from, params.until);
    Ok(Json(state.diagnoser.profile_report(service, window).await))
}

async fn diagnose(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DiagnoseParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = query?;
    let sections = Section::parse_list(params.sections.as_deref().unwrap_or("all"))?;
    let service = params.service.as_deref().filter(|s| !s.is_empty());
    Ok(Json(state.diagnoser.diagnose(&sections, service).await))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/v1/health", get(health_report))
        .route("/api/v1/bottlenecks", get(bottlenecks))
        .route("/api/v1/triage/:app", get(triage))
        .route("/api/v1/diff/:app", get(diff))
        .route("/api/v1/hotspots/:app", get(app_hotspots))
        .route("/api/v1/fleet/hotspots", get(fleet_hotspots))
        .route("/api/v1/http", get(http_report))
        .route("/api/v1/alerts", get(alerts))
        .route("/api/v1/profiles", get(profiles))
        .route("/api/v1/diagnose", get(diagnose))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
