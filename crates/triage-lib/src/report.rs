//! Report assembly
//!
//! [`Diagnoser`] queries the configured backends, degrades every failed query
//! to empty data, runs the evaluators per service and orders the results.
//! Either backend may be absent; its data is then treated as empty.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::backend::{
    promql, Alert, MetricSnapshot, MetricsSource, ProfileKind, ProfileSource, Series, TimeWindow,
};
use crate::bottleneck::{BottleneckResolver, BottleneckVerdict, Hotspots, ServiceSignals};
use crate::diagnosis::{
    self, DiagnosticReport, HttpReport, Section, ServiceProfiles, Sources, PROFILE_TOP_N,
    SLOWEST_ENDPOINTS,
};
use crate::diff::DiffReport;
use crate::fleet::{self, FleetReport};
use crate::flamebearer;
use crate::health::{self, JvmSample, ServiceHealth};
use crate::hotspot::{HotspotClassifier, HotspotReport};
use crate::models::{Summary, TopFunction};
use crate::observability::{StructuredLogger, TriageMetrics};
use crate::service_map::ServiceMap;
use crate::severity::{sort_worst_first, Severity, SeverityRanked};
use crate::thresholds::{Cutoffs, HealthThresholds};
use crate::triage::{ProfileTriage, TriageReport};

/// Top functions fetched per profile type for a bottleneck verdict
const BOTTLENECK_TOP_N: usize = 3;
/// Top functions fetched per application for the fleet ranking
const FLEET_TOP_N: usize = 50;
/// Port the HTTP metrics are exported under
const HTTP_INSTANCE_PORT: u16 = 8080;

/// Counts per severity over an ordered list
pub fn summarize<T: SeverityRanked>(items: &[T]) -> Summary {
    let mut summary = Summary {
        total: items.len(),
        ..Summary::default()
    };
    for item in items {
        match item.severity() {
            Severity::Critical => summary.critical += 1,
            Severity::Warning => summary.warning += 1,
            Severity::Ok => summary.healthy += 1,
        }
    }
    summary
}

/// Mode A report over every JVM service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub services: Vec<ServiceHealth>,
    pub summary: Summary,
}

/// Root-cause report over every JVM service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckReport {
    pub timestamp: DateTime<Utc>,
    pub thresholds: Cutoffs,
    pub services: Vec<BottleneckVerdict>,
    pub summary: Summary,
}

/// The JVM metric snapshots shared by both report modes
struct JvmSnapshots {
    cpu: MetricSnapshot,
    heap_used: MetricSnapshot,
    heap_max: MetricSnapshot,
    gc: MetricSnapshot,
    threads: MetricSnapshot,
}

impl JvmSnapshots {
    fn sample(&self, service: &str) -> JvmSample {
        JvmSample {
            cpu_rate: self.cpu.value(service),
            heap_used: self.heap_used.value(service),
            heap_max: self.heap_max.value(service),
            gc_rate: self.gc.value(service),
            threads: self.threads.value(service),
        }
    }
}

/// Queries backends and assembles reports
pub struct Diagnoser {
    metrics: Option<Arc<dyn MetricsSource>>,
    profiles: Option<Arc<dyn ProfileSource>>,
    service_map: ServiceMap,
    health_thresholds: HealthThresholds,
    telemetry: TriageMetrics,
    logger: StructuredLogger,
}

impl Diagnoser {
    pub fn new(
        metrics: Option<Arc<dyn MetricsSource>>,
        profiles: Option<Arc<dyn ProfileSource>>,
    ) -> Self {
        Self {
            metrics,
            profiles,
            service_map: ServiceMap::default(),
            health_thresholds: HealthThresholds::default(),
            telemetry: TriageMetrics::new(),
            logger: StructuredLogger::new("diagnoser"),
        }
    }

    pub fn with_service_map(mut self, service_map: ServiceMap) -> Self {
        self.service_map = service_map;
        self
    }

    pub fn service_map(&self) -> &ServiceMap {
        &self.service_map
    }

    /// Instant query, empty on a missing or failing backend
    async fn query(&self, expr: &str) -> MetricSnapshot {
        let Some(source) = &self.metrics else {
            return MetricSnapshot::new();
        };
        match source.instant_query(expr).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.telemetry.inc_backend_errors("prometheus");
                self.logger.log_backend_degraded("prometheus", expr, &e.to_string());
                MetricSnapshot::new()
            }
        }
    }

    /// Instant query keeping labels, empty on a missing or failing backend
    async fn series(&self, expr: &str) -> Vec<Series> {
        let Some(source) = &self.metrics else {
            return Vec::new();
        };
        match source.vector_query(expr).await {
            Ok(series) => series,
            Err(e) => {
                self.telemetry.inc_backend_errors("prometheus");
                self.logger.log_backend_degraded("prometheus", expr, &e.to_string());
                Vec::new()
            }
        }
    }

    /// Top functions, empty on a missing or failing backend
    async fn top_functions(&self, app: &str, kind: ProfileKind, n: usize, window: TimeWindow) -> Vec<TopFunction> {
        self.try_top_functions(app, kind, n, window)
            .await
            .unwrap_or_default()
    }

    /// Top functions, `None` when the backend failed
    async fn try_top_functions(
        &self,
        app: &str,
        kind: ProfileKind,
        n: usize,
        window: TimeWindow,
    ) -> Option<Vec<TopFunction>> {
        let Some(source) = &self.profiles else {
            return Some(Vec::new());
        };
        match source.top_functions(app, kind, n, window).await {
            Ok(functions) => Some(functions),
            Err(e) => {
                self.telemetry.inc_backend_errors("pyroscope");
                self.logger
                    .log_backend_degraded("pyroscope", &kind.query_for(app), &e.to_string());
                None
            }
        }
    }

    async fn jvm_snapshots(&self) -> JvmSnapshots {
        let (cpu, heap_used, heap_max, gc, threads) = tokio::join!(
            self.query(promql::CPU_RATE),
            self.query(promql::HEAP_USED),
            self.query(promql::HEAP_MAX),
            self.query(promql::GC_RATE),
            self.query(promql::THREADS),
        );
        JvmSnapshots {
            cpu,
            heap_used,
            heap_max,
            gc,
            threads,
        }
    }

    fn finish(&self, report: &str, summary: &Summary, started: Instant) {
        let elapsed = started.elapsed();
        self.telemetry
            .record_report(report, summary.total, elapsed.as_secs_f64());
        self.logger.log_analysis(
            report,
            summary.total,
            summary.critical,
            summary.warning,
            elapsed.as_millis() as u64,
        );
    }

    /// Health of every service seen in any JVM snapshot, worst first
    ///
    /// With `container` set only that service is evaluated.
    async fn health_services(&self, container: Option<&str>) -> Vec<ServiceHealth> {
        let snaps = self.jvm_snapshots().await;

        let names: BTreeSet<&str> = snaps
            .cpu
            .keys()
            .chain(snaps.gc.keys())
            .chain(snaps.threads.keys())
            .chain(snaps.heap_used.keys().filter(|k| snaps.heap_max.value(k) > 0.0))
            .filter(|svc| container.map_or(true, |c| c == *svc))
            .collect();

        let mut services: Vec<ServiceHealth> = names
            .into_iter()
            .map(|svc| {
                health::evaluate(
                    svc,
                    self.service_map.profiling_name(svc),
                    &snaps.sample(svc),
                    &self.health_thresholds,
                )
            })
            .collect();
        sort_worst_first(&mut services);
        services
    }

    /// Health check of every service seen in any JVM snapshot
    pub async fn health_report(&self) -> HealthReport {
        let started = Instant::now();
        let services = self.health_services(None).await;

        let summary = summarize(&services);
        self.finish("health", &summary, started);

        HealthReport {
            timestamp: Utc::now(),
            services,
            summary,
        }
    }

    /// Root-cause verdict per service
    ///
    /// `service_filter` accepts either the container or the profiling name.
    pub async fn bottleneck_report(&self, cutoffs: Cutoffs, service_filter: Option<&str>) -> BottleneckReport {
        let started = Instant::now();
        let (snaps, req, err, lat_sum, lat_count) = tokio::join!(
            self.jvm_snapshots(),
            self.query(promql::REQUEST_RATE),
            self.query(promql::ERROR_RATE),
            self.query(promql::LATENCY_SUM),
            self.query(promql::LATENCY_COUNT),
        );

        let wanted = service_filter.map(|f| self.service_map.service_name(f));
        let names: Vec<&str> = snaps
            .cpu
            .keys()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|svc| wanted.map_or(true, |w| w == *svc))
            .collect();

        let resolver = BottleneckResolver::new(cutoffs);
        let window = TimeWindow::last_hour();

        let verdicts = join_all(names.iter().map(|svc| {
            let profiling_name = self.service_map.profiling_name(svc);
            let instance = format!("{}:{}", svc, HTTP_INSTANCE_PORT);
            let http_keys = [instance.as_str(), *svc];
            let jvm = snaps.sample(svc);
            let signals = ServiceSignals {
                cpu_rate: jvm.cpu_rate,
                heap_used: jvm.heap_used,
                heap_max: jvm.heap_max,
                gc_rate: jvm.gc_rate,
                threads: jvm.threads,
                req_rate: req.first_of(&http_keys),
                err_rate: err.first_of(&http_keys),
                latency_sum: lat_sum.first_of(&http_keys),
                latency_count: lat_count.first_of(&http_keys),
            };
            let resolver = &resolver;

            async move {
                let (cpu, alloc, mutex) = tokio::join!(
                    self.top_functions(profiling_name, ProfileKind::Cpu, BOTTLENECK_TOP_N, window),
                    self.top_functions(profiling_name, ProfileKind::Alloc, BOTTLENECK_TOP_N, window),
                    self.top_functions(profiling_name, ProfileKind::Mutex, BOTTLENECK_TOP_N, window),
                );
                let hotspots = Hotspots { cpu, alloc, mutex };
                resolver.resolve(svc, profiling_name, &signals, &hotspots)
            }
        }))
        .await;

        let mut services = verdicts;
        sort_worst_first(&mut services);

        let summary = summarize(&services);
        self.finish("bottleneck", &summary, started);

        BottleneckReport {
            timestamp: Utc::now(),
            thresholds: cutoffs,
            services,
            summary,
        }
    }

    /// Profile-only triage of one application
    pub async fn triage(&self, app: &str, kinds: &[ProfileKind], limit: usize, window: TimeWindow) -> TriageReport {
        let started = Instant::now();

        let profiles = join_all(kinds.iter().map(|&kind| async move {
            match self.try_top_functions(app, kind, limit, window).await {
                Some(functions) => ProfileTriage::from_functions(kind, functions),
                None => ProfileTriage::unavailable(kind, "profiling backend query failed"),
            }
        }))
        .await;

        let report = TriageReport::build(app, window, profiles);
        debug!(app = %app, primary = %report.summary.primary_issue, "Triage finished");
        self.finish("triage", &Summary { total: 1, ..Summary::default() }, started);
        report
    }

    /// Compare a baseline window with a current window
    pub async fn diff(
        &self,
        app: &str,
        kind: ProfileKind,
        baseline: TimeWindow,
        current: TimeWindow,
        limit: usize,
    ) -> DiffReport {
        let started = Instant::now();
        let (before, after) = tokio::join!(
            self.top_functions(app, kind, FLEET_TOP_N, baseline),
            self.top_functions(app, kind, FLEET_TOP_N, current),
        );
        let report = DiffReport::build(app, kind, baseline, current, &before, &after, limit);
        self.finish("diff", &Summary { total: 1, ..Summary::default() }, started);
        report
    }

    /// Category breakdown of one application's profile, `None` without data
    pub async fn hotspots(
        &self,
        app: &str,
        kind: ProfileKind,
        classifier: &HotspotClassifier,
        n: usize,
        window: TimeWindow,
    ) -> Option<HotspotReport> {
        let source = self.profiles.as_ref()?;
        let profile = match source.render(app, kind, window).await {
            Ok(profile) => profile?,
            Err(e) => {
                self.telemetry.inc_backend_errors("pyroscope");
                self.logger
                    .log_backend_degraded("pyroscope", &kind.query_for(app), &e.to_string());
                return None;
            }
        };
        let times = flamebearer::decode(&profile)?;
        Some(classifier.report(&times, n))
    }

    /// Profiling names of every discovered JVM service
    pub async fn discover_apps(&self) -> Vec<String> {
        let up = self.query(promql::JVM_UP).await;
        up.keys()
            .map(|svc| self.service_map.profiling_name(svc).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rank functions that are hot across the fleet
    pub async fn fleet_hotspots(&self, kind: ProfileKind, limit: usize, window: TimeWindow) -> FleetReport {
        let started = Instant::now();
        let apps = self.discover_apps().await;

        let per_app = join_all(
            apps.iter()
                .map(|app| self.top_functions(app, kind, FLEET_TOP_N, window)),
        )
        .await;

        let grouped = fleet::group_by_function(
            apps.iter()
                .map(String::as_str)
                .zip(per_app.iter().map(Vec::as_slice)),
        );
        let hotspots = fleet::rank_hotspots(grouped, limit);

        self.finish("fleet", &Summary { total: apps.len(), ..Summary::default() }, started);
        FleetReport { kind, apps, hotspots }
    }

    /// Request rates per HTTP instance plus the slowest routes
    ///
    /// `service_filter` accepts either the container or the profiling name.
    pub async fn http_report(&self, service_filter: Option<&str>) -> HttpReport {
        let started = Instant::now();
        let (req, err, lat_sum, lat_count, routes) = tokio::join!(
            self.query(promql::REQUEST_RATE),
            self.query(promql::ERROR_RATE),
            self.query(promql::LATENCY_SUM),
            self.query(promql::LATENCY_COUNT),
            self.series(promql::SLOWEST_ROUTES),
        );

        let container = service_filter.map(|f| self.service_map.service_name(f));
        let report = HttpReport {
            services: diagnosis::http_stats(&req, &err, &lat_sum, &lat_count, container),
            slowest_endpoints: diagnosis::slowest_endpoints(&routes, SLOWEST_ENDPOINTS),
        };

        self.finish("http", &Summary { total: report.services.len(), ..Summary::default() }, started);
        report
    }

    /// Top five CPU, allocation and lock functions of every profiled application
    ///
    /// Applications come from the profiling backend; `service_filter` matches
    /// the profiling name.
    pub async fn profile_report(&self, service_filter: Option<&str>, window: TimeWindow) -> Vec<ServiceProfiles> {
        let started = Instant::now();
        let apps: Vec<String> = self
            .profiled_apps(window)
            .await
            .into_iter()
            .filter(|app| service_filter.map_or(true, |f| self.service_map.profiling_name(f) == app.as_str()))
            .collect();

        let report = join_all(apps.into_iter().map(|app| async move {
            let (cpu_top5, memory_top5, mutex_top5) = tokio::join!(
                self.top_functions(&app, ProfileKind::Cpu, PROFILE_TOP_N, window),
                self.top_functions(&app, ProfileKind::Alloc, PROFILE_TOP_N, window),
                self.top_functions(&app, ProfileKind::Mutex, PROFILE_TOP_N, window),
            );
            ServiceProfiles {
                service: app,
                cpu_top5,
                memory_top5,
                mutex_top5,
            }
        }))
        .await;

        self.finish("profiles", &Summary { total: report.len(), ..Summary::default() }, started);
        report
    }

    /// Application names known to the profiling backend, empty on failure
    async fn profiled_apps(&self, window: TimeWindow) -> Vec<String> {
        let Some(source) = &self.profiles else {
            return Vec::new();
        };
        match source.app_names(window).await {
            Ok(apps) => apps,
            Err(e) => {
                self.telemetry.inc_backend_errors("pyroscope");
                self.logger.log_backend_degraded("pyroscope", "label-values", &e.to_string());
                Vec::new()
            }
        }
    }

    /// Alerts firing in the metrics backend, empty on a missing or failing backend
    pub async fn alerts_report(&self) -> Vec<Alert> {
        let Some(source) = &self.metrics else {
            return Vec::new();
        };
        match source.firing_alerts().await {
            Ok(alerts) => alerts,
            Err(e) => {
                self.telemetry.inc_backend_errors("prometheus");
                self.logger.log_backend_degraded("prometheus", "alerts", &e.to_string());
                Vec::new()
            }
        }
    }

    /// Combined report of the requested sections
    ///
    /// `service_filter` accepts either the container or the profiling name
    /// and narrows the health, HTTP and profile sections.
    pub async fn diagnose(&self, sections: &[Section], service_filter: Option<&str>) -> DiagnosticReport {
        let started = Instant::now();
        let wants = |section: Section| sections.contains(&section);
        let container = service_filter.map(|f| self.service_map.service_name(f));

        let health = async {
            if wants(Section::Health) {
                Some(self.health_services(container).await)
            } else {
                None
            }
        };
        let http = async {
            if wants(Section::Http) {
                Some(self.http_report(service_filter).await)
            } else {
                None
            }
        };
        let profiles = async {
            if wants(Section::Profiles) {
                Some(self.profile_report(service_filter, TimeWindow::last_hour()).await)
            } else {
                None
            }
        };
        let alerts = async {
            if wants(Section::Alerts) {
                Some(self.alerts_report().await)
            } else {
                None
            }
        };
        let (health, http, profiles, alerts) = tokio::join!(health, http, profiles, alerts);

        let summary = health.as_deref().map(summarize).unwrap_or_default();
        self.finish("diagnose", &summary, started);

        DiagnosticReport {
            timestamp: Utc::now(),
            sources: Sources {
                prometheus: self.metrics.as_ref().map(|m| m.endpoint().to_string()),
                pyroscope: self.profiles.as_ref().map(|p| p.endpoint().to_string()),
            },
            health,
            http,
            profiles,
            alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::async_trait;
    use crate::bottleneck::Verdict;
    use crate::error::{Error, Result};
    use crate::flamebearer::FlamebearerProfile;
    use crate::triage::Diagnosis;
    use std::collections::HashMap;

    /// Metrics source answering from a fixed table; unknown queries fail
    struct StaticMetrics {
        answers: HashMap<&'static str, Vec<(&'static str, f64)>>,
        alerts: Option<Vec<Alert>>,
    }

    #[async_trait]
    impl MetricsSource for StaticMetrics {
        fn endpoint(&self) -> &str {
            "http://prometheus.test/"
        }

        async fn vector_query(&self, expr: &str) -> Result<Vec<Series>> {
            // the route ranking is keyed by route, every other query by service
            let label = if expr == promql::SLOWEST_ROUTES { "route" } else { "service" };
            match self.answers.get(expr) {
                Some(rows) => Ok(rows.iter().map(|(k, v)| Series::new(&[(label, *k)], *v)).collect()),
                None => Err(Error::Backend {
                    backend: "prometheus",
                    message: "no such series".into(),
                }),
            }
        }

        async fn firing_alerts(&self) -> Result<Vec<Alert>> {
            self.alerts.clone().ok_or_else(|| Error::Backend {
                backend: "prometheus",
                message: "alerts unavailable".into(),
            })
        }
    }

    /// Profile source returning fixed top lists per (app, kind)
    struct StaticProfiles {
        tops: HashMap<(&'static str, ProfileKind), Vec<TopFunction>>,
    }

    #[async_trait]
    impl ProfileSource for StaticProfiles {
        fn endpoint(&self) -> &str {
            "http://pyroscope.test/"
        }

        async fn app_names(&self, _: TimeWindow) -> Result<Vec<String>> {
            let mut apps: BTreeSet<String> = self.tops.keys().map(|(app, _)| app.to_string()).collect();
            apps.insert("broken".to_string());
            Ok(apps.into_iter().collect())
        }

        async fn render(&self, _: &str, _: ProfileKind, _: TimeWindow) -> Result<Option<FlamebearerProfile>> {
            Ok(None)
        }

        async fn top_functions(
            &self,
            app: &str,
            kind: ProfileKind,
            n: usize,
            _: TimeWindow,
        ) -> Result<Vec<TopFunction>> {
            if app == "broken" {
                return Err(Error::Backend {
                    backend: "pyroscope",
                    message: "timeout".into(),
                });
            }
            let mut list = self
                .tops
                .iter()
                .find(|((a, k), _)| *a == app && *k == kind)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            list.truncate(n);
            Ok(list)
        }
    }

    fn metrics() -> Arc<dyn MetricsSource> {
        let mut answers = HashMap::new();
        answers.insert(promql::JVM_UP, vec![("orders", 1.0), ("gateway", 1.0), ("ledger", 1.0)]);
        answers.insert(promql::CPU_RATE, vec![("orders", 0.85), ("gateway", 0.1), ("ledger", 0.05)]);
        answers.insert(promql::HEAP_USED, vec![("orders", 400.0), ("gateway", 100.0), ("ledger", 100.0)]);
        answers.insert(promql::HEAP_MAX, vec![("orders", 1000.0), ("gateway", 1000.0), ("ledger", 1000.0)]);
        answers.insert(promql::GC_RATE, vec![("orders", 0.01)]);
        answers.insert(promql::THREADS, vec![("orders", 40.0), ("gateway", 20.0), ("ledger", 20.0)]);
        answers.insert(promql::REQUEST_RATE, vec![("gateway:8080", 50.0), ("ledger", 5.0)]);
        answers.insert(promql::ERROR_RATE, vec![("gateway:8080", 1.0)]);
        answers.insert(promql::LATENCY_SUM, vec![("gateway:8080", 45.0), ("ledger", 0.2)]);
        answers.insert(promql::LATENCY_COUNT, vec![("gateway:8080", 50.0), ("ledger", 5.0)]);
        answers.insert(promql::SLOWEST_ROUTES, vec![("/checkout", 0.85), ("/health", 0.0), ("/cart", 0.12)]);
        let alerts = vec![Alert {
            name: "HighHeap".into(),
            severity: "warning".into(),
            instance: "orders:8080".into(),
            summary: "Heap above 85%".into(),
            active_since: "2026-10-18T09:00:00Z".into(),
        }];
        Arc::new(StaticMetrics {
            answers,
            alerts: Some(alerts),
        })
    }

    fn profiles() -> Arc<dyn ProfileSource> {
        let mut tops = HashMap::new();
        tops.insert(
            ("orders-app", ProfileKind::Cpu),
            vec![
                TopFunction::new("com.example.Pricing.compute", 42.0),
                TopFunction::new("java.util.HashMap.get", 8.0),
            ],
        );
        tops.insert(
            ("gateway", ProfileKind::Cpu),
            vec![TopFunction::new("java.util.HashMap.get", 12.0)],
        );
        Arc::new(StaticProfiles { tops })
    }

    fn diagnoser() -> Diagnoser {
        Diagnoser::new(Some(metrics()), Some(profiles()))
            .with_service_map([("orders", "orders-app")].into_iter().collect())
    }

    #[tokio::test]
    async fn test_bottleneck_report_orders_and_summarizes() {
        let report = diagnoser().bottleneck_report(Cutoffs::default(), None).await;

        let names: Vec<_> = report.services.iter().map(|v| v.service.as_str()).collect();
        assert_eq!(names, vec!["orders", "gateway", "ledger"]);

        let orders = &report.services[0];
        assert_eq!(orders.verdict, Verdict::CpuBound);
        assert_eq!(orders.severity, Severity::Critical);
        assert_eq!(orders.profiling_name, "orders-app");
        assert_eq!(orders.primary_function.as_deref(), Some("com.example.Pricing.compute"));

        let gateway = &report.services[1];
        assert_eq!(gateway.verdict, Verdict::IoBound);
        assert_eq!(gateway.metrics.avg_latency_ms, 900.0);
        assert_eq!(gateway.metrics.err_pct, 2.0);
        assert_eq!(gateway.metrics.req_per_sec, 50.0);

        let ledger = &report.services[2];
        assert_eq!(ledger.verdict, Verdict::Healthy);
        assert_eq!(ledger.metrics.avg_latency_ms, 40.0);

        assert_eq!(
            report.summary,
            Summary {
                total: 3,
                critical: 1,
                warning: 1,
                healthy: 1
            }
        );
    }

    #[tokio::test]
    async fn test_service_filter_accepts_profiling_name() {
        let d = diagnoser();
        let report = d.bottleneck_report(Cutoffs::default(), Some("orders-app")).await;
        assert_eq!(report.services.len(), 1);
        assert_eq!(report.services[0].service, "orders");

        let report = d.bottleneck_report(Cutoffs::default(), Some("gateway")).await;
        assert_eq!(report.services.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_backends_degrade_to_empty() {
        let d = Diagnoser::new(None, None);
        let health = d.health_report().await;
        assert!(health.services.is_empty());
        assert_eq!(health.summary, Summary::default());

        let bottleneck = d.bottleneck_report(Cutoffs::default(), None).await;
        assert!(bottleneck.services.is_empty());
    }

    #[tokio::test]
    async fn test_health_report() {
        let report = diagnoser().health_report().await;
        assert_eq!(report.services.len(), 3);
        assert_eq!(report.services[0].service, "orders");
        assert_eq!(report.services[0].status, Severity::Critical);
        assert_eq!(report.summary.healthy, 2);
    }

    #[tokio::test]
    async fn test_triage_marks_failed_backend_unavailable() {
        let d = diagnoser();
        let report = d
            .triage("orders-app", &[ProfileKind::Cpu, ProfileKind::Alloc], 10, TimeWindow::new(0, 60))
            .await;
        assert_eq!(report.summary.primary_issue, Diagnosis::CpuBound);
        assert_eq!(report.profiles[1].diagnosis, Diagnosis::NoData);

        let report = d.triage("broken", &[ProfileKind::Cpu], 10, TimeWindow::new(0, 60)).await;
        assert_eq!(report.profiles[0].diagnosis, Diagnosis::Unavailable);
        assert_eq!(report.summary.primary_issue, Diagnosis::Healthy);
    }

    #[tokio::test]
    async fn test_hotspots_without_profile_is_none() {
        let d = diagnoser();
        let classifier = HotspotClassifier::default();
        let window = TimeWindow::new(0, 60);
        assert!(d.hotspots("orders-app", ProfileKind::Cpu, &classifier, 5, window).await.is_none());
        assert!(Diagnoser::new(None, None)
            .hotspots("orders-app", ProfileKind::Cpu, &classifier, 5, window)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_fleet_hotspots_across_discovered_apps() {
        let report = diagnoser()
            .fleet_hotspots(ProfileKind::Cpu, 10, TimeWindow::new(0, 60))
            .await;
        assert_eq!(report.apps, vec!["gateway", "ledger", "orders-app"]);
        assert_eq!(report.hotspots[0].function, "com.example.Pricing.compute");
        assert_eq!(report.hotspots[1].function, "java.util.HashMap.get");
        assert_eq!(report.hotspots[1].service_count, 2);
        assert_eq!(report.hotspots[1].impact_score, 24.0);
    }
    #[tokio::test]
    async fn test_http_report() {
        let d = diagnoser();
        let report = d.http_report(None).await;
        let instances: Vec<_> = report.services.iter().map(|s| s.instance.as_str()).collect();
        assert_eq!(instances, vec!["gateway:8080", "ledger"]);
        assert_eq!(report.services[0].service, "gateway");
        assert_eq!(report.services[0].avg_latency_ms, 900.0);
        assert_eq!(report.services[0].err_pct, 2.0);

        let routes: Vec<_> = report.slowest_endpoints.iter().map(|e| e.route.as_str()).collect();
        assert_eq!(routes, vec!["/checkout", "/cart"]);

        let only = d.http_report(Some("ledger")).await;
        assert_eq!(only.services.len(), 1);
        assert_eq!(only.slowest_endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_profile_report_skips_failing_apps() {
        let d = diagnoser();
        let report = d.profile_report(None, TimeWindow::new(0, 60)).await;
        let apps: Vec<_> = report.iter().map(|p| p.service.as_str()).collect();
        assert_eq!(apps, vec!["broken", "gateway", "orders-app"]);
        assert!(report[0].cpu_top5.is_empty());
        assert_eq!(report[2].cpu_top5[0].function, "com.example.Pricing.compute");
        assert!(report[2].memory_top5.is_empty());

        // container name resolves to the profiling name
        let report = d.profile_report(Some("orders"), TimeWindow::new(0, 60)).await;
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].service, "orders-app");
    }

    #[tokio::test]
    async fn test_alerts_degrade_on_failure() {
        let alerts = diagnoser().alerts_report().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].name, "HighHeap");

        let failing = Diagnoser::new(
            Some(Arc::new(StaticMetrics {
                answers: HashMap::new(),
                alerts: None,
            })),
            None,
        );
        assert!(failing.alerts_report().await.is_empty());
    }

    #[tokio::test]
    async fn test_diagnose_collects_requested_sections() {
        let d = diagnoser();
        let report = d.diagnose(&[Section::Health, Section::Alerts], None).await;
        assert_eq!(report.sources.prometheus.as_deref(), Some("http://prometheus.test/"));
        assert_eq!(report.sources.pyroscope.as_deref(), Some("http://pyroscope.test/"));
        assert_eq!(report.health.as_ref().map(Vec::len), Some(3));
        assert_eq!(report.alerts.as_ref().map(Vec::len), Some(1));
        assert!(report.http.is_none());
        assert!(report.profiles.is_none());

        let report = d.diagnose(&Section::ALL, Some("orders-app")).await;
        let health = report.health.unwrap();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].service, "orders");
        assert!(report.http.unwrap().services.is_empty());
        assert_eq!(report.profiles.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_diagnose_without_backends() {
        let report = Diagnoser::new(None, None).diagnose(&Section::ALL, None).await;
        assert_eq!(report.sources, Sources::default());
        assert!(report.health.unwrap().is_empty());
        assert_eq!(report.http.unwrap(), HttpReport::default());
        assert!(report.profiles.unwrap().is_empty());
        assert!(report.alerts.unwrap().is_empty());
    }
}
