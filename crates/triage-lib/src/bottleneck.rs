//! Root-cause classification for a single service
//!
//! Resource metrics, HTTP latency and profiling hotspots are folded into one
//! verdict. Signals are checked in a fixed priority order and the first one
//! recorded wins, regardless of magnitude. Severity is computed separately
//! from hardcoded critical lines, so a verdict can be critical because of a
//! metric other than the one that chose it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::models::{ratio_or_zero, round_to, TopFunction};
use crate::severity::{Severity, SeverityRanked};
use crate::thresholds::Cutoffs;

/// CPU rate at or above which a service is critical
pub const CRITICAL_CPU_RATE: f64 = 0.8;
/// Heap fraction at or above which a service is critical
pub const CRITICAL_HEAP_PCT: f64 = 0.85;
/// GC seconds per second at or above which a service is critical
pub const CRITICAL_GC_RATE: f64 = 0.1;
/// Top mutex self percent above which a service is lock-bound
pub const LOCK_CONTENTION_PCT: f64 = 5.0;

/// Root-cause verdict kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Healthy,
    CpuBound,
    GcBound,
    MemoryPressure,
    LockBound,
    IoBound,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Healthy => "healthy",
            Verdict::CpuBound => "cpu-bound",
            Verdict::GcBound => "gc-bound",
            Verdict::MemoryPressure => "memory-pressure",
            Verdict::LockBound => "lock-bound",
            Verdict::IoBound => "io-bound",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Verdict::Healthy),
            "cpu-bound" => Ok(Verdict::CpuBound),
            "gc-bound" => Ok(Verdict::GcBound),
            "memory-pressure" => Ok(Verdict::MemoryPressure),
            "lock-bound" => Ok(Verdict::LockBound),
            "io-bound" => Ok(Verdict::IoBound),
            other => Err(format!("unknown verdict: {}", other)),
        }
    }
}

/// Generic follow-up pointing at the per-service profile triage
pub fn investigate_hint(profiling_name: &str) -> String {
    format!("Investigate with: jvmt triage {}", profiling_name)
}

/// Raw metrics for one service, zero when a snapshot had no entry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServiceSignals {
    pub cpu_rate: f64,
    pub heap_used: f64,
    pub heap_max: f64,
    pub gc_rate: f64,
    pub threads: f64,
    pub req_rate: f64,
    pub err_rate: f64,
    pub latency_sum: f64,
    pub latency_count: f64,
}

impl ServiceSignals {
    pub fn heap_pct(&self) -> f64 {
        ratio_or_zero(self.heap_used, self.heap_max)
    }

    pub fn avg_latency_ms(&self) -> f64 {
        ratio_or_zero(self.latency_sum, self.latency_count) * 1000.0
    }

    pub fn err_pct(&self) -> f64 {
        ratio_or_zero(self.err_rate, self.req_rate) * 100.0
    }
}

/// Top-N hotspot lists for one service, already percent-normalised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hotspots {
    pub cpu: Vec<TopFunction>,
    pub alloc: Vec<TopFunction>,
    pub mutex: Vec<TopFunction>,
}

/// A detected bottleneck signal with its supporting hotspots
#[derive(Debug, Clone, PartialEq)]
struct Signal<'a> {
    kind: Verdict,
    magnitude: f64,
    evidence: &'a [TopFunction],
}

/// Rounded metrics carried in a bottleneck report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckMetrics {
    pub cpu_rate: f64,
    pub heap_pct: f64,
    pub gc_rate: f64,
    pub threads: u64,
    pub req_per_sec: f64,
    pub err_pct: f64,
    pub avg_latency_ms: f64,
}

/// Verdict for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckVerdict {
    pub service: String,
    pub profiling_name: String,
    pub verdict: Verdict,
    pub severity: Severity,
    pub metrics: BottleneckMetrics,
    pub top_cpu: Vec<TopFunction>,
    pub top_alloc: Vec<TopFunction>,
    pub top_mutex: Vec<TopFunction>,
    pub primary_function: Option<String>,
    pub action: String,
}

impl SeverityRanked for BottleneckVerdict {
    fn severity(&self) -> Severity {
        self.severity
    }

    fn identity(&self) -> &str {
        &self.service
    }
}

/// Resolves one verdict per service against fixed cutoffs
#[derive(Debug, Clone, Default)]
pub struct BottleneckResolver {
    cutoffs: Cutoffs,
}

impl BottleneckResolver {
    pub fn new(cutoffs: Cutoffs) -> Self {
        Self { cutoffs }
    }

    pub fn cutoffs(&self) -> &Cutoffs {
        &self.cutoffs
    }

    /// Signals in priority order; the first entry is the primary one
    fn detect<'a>(&self, s: &ServiceSignals, hotspots: &'a Hotspots) -> Vec<Signal<'a>> {
        let heap_pct = s.heap_pct();
        let mutex_top = hotspots.mutex.first().map_or(0.0, |f| f.self_pct);

        let checks: [(Verdict, bool, f64, &'a [TopFunction]); 4] = [
            (Verdict::CpuBound, s.cpu_rate >= self.cutoffs.cpu, s.cpu_rate, hotspots.cpu.as_slice()),
            (Verdict::GcBound, s.gc_rate >= self.cutoffs.gc, s.gc_rate, hotspots.alloc.as_slice()),
            (
                Verdict::MemoryPressure,
                heap_pct >= self.cutoffs.heap_pct,
                heap_pct,
                hotspots.alloc.as_slice(),
            ),
            (
                Verdict::LockBound,
                mutex_top > LOCK_CONTENTION_PCT,
                mutex_top,
                hotspots.mutex.as_slice(),
            ),
        ];

        let mut signals: Vec<Signal<'a>> = checks
            .into_iter()
            .filter(|(_, fired, _, _)| *fired)
            .map(|(kind, _, magnitude, evidence)| Signal {
                kind,
                magnitude,
                evidence,
            })
            .collect();

        let avg_latency = s.avg_latency_ms();
        if signals.is_empty() && avg_latency > self.cutoffs.latency_ms {
            signals.push(Signal {
                kind: Verdict::IoBound,
                magnitude: avg_latency,
                evidence: &[],
            });
        }

        signals
    }

    /// Severity from the hardcoded critical lines, independent of the verdict
    pub fn severity(s: &ServiceSignals) -> Severity {
        if s.cpu_rate >= CRITICAL_CPU_RATE
            || s.heap_pct() >= CRITICAL_HEAP_PCT
            || s.gc_rate >= CRITICAL_GC_RATE
        {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    /// Produce the verdict for one service
    pub fn resolve(
        &self,
        service: &str,
        profiling_name: &str,
        signals: &ServiceSignals,
        hotspots: &Hotspots,
    ) -> BottleneckVerdict {
        let detected = self.detect(signals, hotspots);

        let (verdict, severity, primary_function, action) = match detected.first() {
            None => (Verdict::Healthy, Severity::Ok, None, "No action needed".to_string()),
            Some(primary) => {
                let primary_function = primary.evidence.first().map(|f| f.function.clone());
                let action = action_text(primary.kind, primary_function.as_deref(), signals, hotspots);
                (primary.kind, Self::severity(signals), primary_function, action)
            }
        };

        debug!(
            service = %service,
            verdict = %verdict,
            severity = %severity,
            signals = ?detected.iter().map(|s| (s.kind.as_str(), s.magnitude)).collect::<Vec<_>>(),
            "Resolved bottleneck verdict"
        );

        BottleneckVerdict {
            service: service.to_string(),
            profiling_name: profiling_name.to_string(),
            verdict,
            severity,
            metrics: BottleneckMetrics {
                cpu_rate: round_to(signals.cpu_rate, 3),
                heap_pct: round_to(signals.heap_pct(), 3),
                gc_rate: round_to(signals.gc_rate, 4),
                threads: signals.threads.max(0.0) as u64,
                req_per_sec: round_to(signals.req_rate, 1),
                err_pct: round_to(signals.err_pct(), 1),
                avg_latency_ms: round_to(signals.avg_latency_ms(), 1),
            },
            top_cpu: hotspots.cpu.iter().take(1).cloned().collect(),
            top_alloc: hotspots.alloc.iter().take(1).cloned().collect(),
            top_mutex: hotspots.mutex.iter().take(1).cloned().collect(),
            primary_function,
            action,
        }
    }
}

fn action_text(
    verdict: Verdict,
    primary_function: Option<&str>,
    s: &ServiceSignals,
    hotspots: &Hotspots,
) -> String {
    match verdict {
        Verdict::Healthy => "No action needed".to_string(),
        Verdict::CpuBound => format!(
            "Optimize {}; see the CPU flame graph",
            primary_function.unwrap_or("top CPU function")
        ),
        Verdict::GcBound => format!(
            "Reduce allocations in {}; GC rate {:.3} s/s",
            hotspots
                .alloc
                .first()
                .map_or("top allocator", |f| f.function.as_str()),
            s.gc_rate
        ),
        Verdict::MemoryPressure => format!(
            "Heap at {:.0}%; check the allocation flame graph for leaks or raise the heap limit",
            s.heap_pct() * 100.0
        ),
        Verdict::LockBound => format!(
            "Reduce lock scope in {}; see the mutex flame graph",
            primary_function.unwrap_or("contended method")
        ),
        Verdict::IoBound => format!(
            "Avg latency {:.0}ms with low CPU; check downstream dependencies, connection pools and timeouts",
            s.avg_latency_ms()
        ),
    }
}
