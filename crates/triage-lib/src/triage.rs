//! Profile-only triage
//!
//! Looks at the top functions of each requested profile type and names the
//! pattern they match. Unlike the bottleneck resolver this needs no metrics,
//! only a profiling backend.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::{ProfileKind, TimeWindow};
use crate::models::TopFunction;

/// How many of the top functions are inspected for a pattern
const PATTERN_WINDOW: usize = 5;

const GC_PATTERNS: &[&str] = &["GC", "gc_", "G1", "ParallelGC", "ZGC"];
const WAIT_PATTERNS: &[&str] = &["park", "sleep", "Object.wait", "Unsafe.park"];
const LOCK_PATTERNS: &[&str] = &["synchronized", "ReentrantLock", "monitor"];
const JIT_PATTERNS: &[&str] = &["Compiler", "C1", "C2", "compile"];
const STRING_PATTERNS: &[&str] = &["StringBuilder", "concat", "toString", "String.format"];
const COLLECTION_PATTERNS: &[&str] = &["ArrayList", "HashMap", "resize", "grow", "Arrays.copyOf"];
const DESERIALIZE_PATTERNS: &[&str] = &[
    "read",
    "decode",
    "parse",
    "deserialize",
    "Jackson",
    "Gson",
    "ObjectMapper",
];
const IDLE_PATTERNS: &[&str] = &["sleep", "wait", "park", "idle"];
const NETWORK_PATTERNS: &[&str] = &[
    "socket",
    "connect",
    "dns",
    "InputStream.read",
    "OutputStream.write",
    "SocketChannel",
];

/// Pattern recognised in a profile's top functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    Healthy,
    NoData,
    Unavailable,
    GcPressure,
    ThreadWaiting,
    LockContention,
    JitOverhead,
    CpuBound,
    StringAllocation,
    CollectionResizing,
    DeserializationOverhead,
    AllocationPressure,
    IdleTime,
    NetworkIo,
    MixedWorkload,
}

impl Diagnosis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Healthy => "healthy",
            Diagnosis::NoData => "no_data",
            Diagnosis::Unavailable => "unavailable",
            Diagnosis::GcPressure => "gc_pressure",
            Diagnosis::ThreadWaiting => "thread_waiting",
            Diagnosis::LockContention => "lock_contention",
            Diagnosis::JitOverhead => "jit_overhead",
            Diagnosis::CpuBound => "cpu_bound",
            Diagnosis::StringAllocation => "string_allocation",
            Diagnosis::CollectionResizing => "collection_resizing",
            Diagnosis::DeserializationOverhead => "deserialization_overhead",
            Diagnosis::AllocationPressure => "allocation_pressure",
            Diagnosis::IdleTime => "idle_time",
            Diagnosis::NetworkIo => "network_io",
            Diagnosis::MixedWorkload => "mixed_workload",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact of the dominant function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn from_self_percent(max_self_percent: f64) -> Self {
        if max_self_percent > 30.0 {
            Impact::High
        } else if max_self_percent > 10.0 {
            Impact::Medium
        } else {
            Impact::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn matches_any(functions: &[TopFunction], patterns: &[&str]) -> bool {
    functions
        .iter()
        .take(PATTERN_WINDOW)
        .any(|f| patterns.iter().any(|p| f.function.contains(p)))
}

/// Name the pattern in one profile's top functions
pub fn diagnose(kind: ProfileKind, functions: &[TopFunction]) -> Diagnosis {
    if functions.is_empty() {
        return Diagnosis::NoData;
    }

    let rules: &[(&[&str], Diagnosis)] = match kind {
        ProfileKind::Cpu => &[
            (GC_PATTERNS, Diagnosis::GcPressure),
            (WAIT_PATTERNS, Diagnosis::ThreadWaiting),
            (LOCK_PATTERNS, Diagnosis::LockContention),
            (JIT_PATTERNS, Diagnosis::JitOverhead),
        ],
        ProfileKind::Alloc => &[
            (STRING_PATTERNS, Diagnosis::StringAllocation),
            (COLLECTION_PATTERNS, Diagnosis::CollectionResizing),
            (DESERIALIZE_PATTERNS, Diagnosis::DeserializationOverhead),
        ],
        ProfileKind::Mutex => return Diagnosis::LockContention,
        ProfileKind::Wall => &[
            (IDLE_PATTERNS, Diagnosis::IdleTime),
            (NETWORK_PATTERNS, Diagnosis::NetworkIo),
        ],
    };

    rules
        .iter()
        .find(|(patterns, _)| matches_any(functions, patterns))
        .map(|(_, diagnosis)| *diagnosis)
        .unwrap_or(match kind {
            ProfileKind::Cpu => Diagnosis::CpuBound,
            ProfileKind::Alloc => Diagnosis::AllocationPressure,
            ProfileKind::Mutex => Diagnosis::LockContention,
            ProfileKind::Wall => Diagnosis::MixedWorkload,
        })
}

/// Recommendation for a diagnosis, naming the top function where it helps
pub fn recommend(diagnosis: Diagnosis, top_function: Option<&str>) -> String {
    let Some(top) = top_function else {
        return "No profile data available for this type".to_string();
    };

    let advice = match diagnosis {
        Diagnosis::GcPressure => {
            "GC activity in CPU profile; check heap sizing (-Xmx) and reduce allocation rate"
        }
        Diagnosis::ThreadWaiting => {
            "Threads spending CPU in wait/park; possible thread pool exhaustion"
        }
        Diagnosis::LockContention => {
            "Lock contention; review synchronized blocks, consider concurrent collections"
        }
        Diagnosis::JitOverhead => {
            return "JIT compilation overhead; service may need warmup time".to_string()
        }
        Diagnosis::CpuBound => "CPU-bound processing; review algorithmic complexity or add caching",
        Diagnosis::StringAllocation => {
            "High string allocation; use StringBuilder, avoid concatenation in loops"
        }
        Diagnosis::CollectionResizing => {
            "Collection resizing; pre-size collections with expected capacity"
        }
        Diagnosis::DeserializationOverhead => {
            "Deserialization allocation; consider streaming parsers or object pooling"
        }
        Diagnosis::AllocationPressure => "High allocation rate; review object creation patterns",
        Diagnosis::NetworkIo => "Network I/O dominates wall-clock time; check upstream latency and timeouts",
        Diagnosis::IdleTime => {
            return "Significant idle time; thread pool may be oversized".to_string()
        }
        Diagnosis::MixedWorkload => "Mixed workload; no single dominant bottleneck",
        Diagnosis::Healthy | Diagnosis::NoData | Diagnosis::Unavailable => {
            "Review top functions for optimization"
        }
    };

    format!("{}. Top: {}", advice, top)
}

/// Triage of one profile type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTriage {
    pub kind: ProfileKind,
    pub diagnosis: Diagnosis,
    pub top_functions: Vec<TopFunction>,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProfileTriage {
    pub fn from_functions(kind: ProfileKind, top_functions: Vec<TopFunction>) -> Self {
        let diagnosis = diagnose(kind, &top_functions);
        let recommendation = recommend(diagnosis, top_functions.first().map(|f| f.function.as_str()));
        Self {
            kind,
            diagnosis,
            top_functions,
            recommendation,
            error: None,
        }
    }

    /// Placeholder for a profile type whose query failed
    pub fn unavailable(kind: ProfileKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            diagnosis: Diagnosis::Unavailable,
            top_functions: Vec::new(),
            recommendation: "Profile data could not be fetched".to_string(),
            error: Some(error.into()),
        }
    }

    fn top_self_percent(&self) -> f64 {
        self.top_functions.first().map_or(0.0, |f| f.self_pct)
    }
}

/// Overall verdict across profile types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub primary_issue: Diagnosis,
    pub impact: Impact,
    pub recommendation: String,
}

/// Triage report for one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub app: String,
    pub from: i64,
    pub until: i64,
    pub profiles: Vec<ProfileTriage>,
    pub summary: TriageSummary,
}

impl TriageReport {
    /// Pick the profile type whose top function is strictly the largest
    pub fn build(app: impl Into<String>, window: TimeWindow, profiles: Vec<ProfileTriage>) -> Self {
        let mut primary_issue = Diagnosis::Healthy;
        let mut recommendation = "No significant issues detected".to_string();
        let mut max_self = 0.0;

        for profile in &profiles {
            let top = profile.top_self_percent();
            if top > max_self {
                max_self = top;
                primary_issue = profile.diagnosis;
                recommendation = profile.recommendation.clone();
            }
        }

        Self {
            app: app.into(),
            from: window.from,
            until: window.until,
            profiles,
            summary: TriageSummary {
                primary_issue,
                impact: Impact::from_self_percent(max_self),
                recommendation,
            },
        }
    }
}
