//! Hotspot ranking and code-origin classification
//!
//! Functions are tagged as application, library, JVM or other code by
//! prefix. Matching runs on the dot-separated form of the name so JFR-style
//! `java/lang/String.indexOf` and `java.lang.String.indexOf` classify alike.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::flamebearer::SelfTimes;
use crate::models::{round_to, TopFunction};

/// Default application package prefix
pub const DEFAULT_APP_PREFIX: &str = "com.example.";

/// JVM and platform packages, checked before library packages
pub const JVM_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "jdk.",
    "sun.",
    "com.sun.",
    "org.graalvm.",
    "jdk.internal.",
];

/// Third-party library packages
pub const LIB_PREFIXES: &[&str] = &[
    "io.vertx.",
    "io.netty.",
    "io.pyroscope.",
    "org.apache.",
    "org.slf4j.",
    "ch.qos.",
    "com.fasterxml.",
    "org.jboss.",
    "one.profiler.",
];

/// Code-origin category of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    App,
    Lib,
    Jvm,
    Other,
}

impl Category {
    /// Presentation order used in category summaries
    pub const DISPLAY_ORDER: [Category; 4] =
        [Category::App, Category::Lib, Category::Jvm, Category::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::App => "app",
            Category::Lib => "lib",
            Category::Jvm => "jvm",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert slash-separated frame names to dot-separated form
pub fn normalize(name: &str) -> Cow<'_, str> {
    if name.contains('/') {
        Cow::Owned(name.replace('/', "."))
    } else {
        Cow::Borrowed(name)
    }
}

/// A function ranked by self-time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSelfTime {
    pub function_name: String,
    pub self_value: u64,
    pub self_percent: f64,
    pub category: Category,
}

/// Per-category aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub self_value: u64,
    pub self_percent: f64,
    pub functions: usize,
}

/// Category breakdown plus global and application top lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotspotReport {
    pub total_ticks: u64,
    pub functions: usize,
    pub categories: Vec<CategorySummary>,
    pub top: Vec<FunctionSelfTime>,
    pub top_app: Vec<FunctionSelfTime>,
}

/// Classifies and ranks decoded functions
#[derive(Debug, Clone)]
pub struct HotspotClassifier {
    app_prefix: String,
}

impl Default for HotspotClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_APP_PREFIX)
    }
}

impl HotspotClassifier {
    pub fn new(app_prefix: impl Into<String>) -> Self {
        Self {
            app_prefix: app_prefix.into(),
        }
    }

    pub fn app_prefix(&self) -> &str {
        &self.app_prefix
    }

    /// First match wins: app, then JVM, then library, else other
    pub fn classify(&self, name: &str) -> Category {
        let name = normalize(name);
        if name.starts_with(self.app_prefix.as_str()) {
            Category::App
        } else if JVM_PREFIXES.iter().any(|p| name.starts_with(p)) {
            Category::Jvm
        } else if LIB_PREFIXES.iter().any(|p| name.starts_with(p)) {
            Category::Lib
        } else {
            Category::Other
        }
    }

    /// Every function, largest self-time first
    pub fn rank(&self, times: &SelfTimes) -> Vec<FunctionSelfTime> {
        times
            .ranked()
            .into_iter()
            .map(|(name, value)| FunctionSelfTime {
                function_name: name.to_string(),
                self_value: value,
                self_percent: times.percent_of(value),
                category: self.classify(name),
            })
            .collect()
    }

    /// Global top-N ranking
    pub fn top(&self, times: &SelfTimes, n: usize) -> Vec<FunctionSelfTime> {
        let mut ranked = self.rank(times);
        ranked.truncate(n);
        ranked
    }

    /// Top-N ranking restricted to application code
    pub fn top_app(&self, times: &SelfTimes, n: usize) -> Vec<FunctionSelfTime> {
        self.rank(times)
            .into_iter()
            .filter(|f| f.category == Category::App)
            .take(n)
            .collect()
    }

    /// Top-N ranking restricted to names starting with `prefix`
    pub fn filter_prefix(&self, times: &SelfTimes, prefix: &str, n: usize) -> Vec<FunctionSelfTime> {
        self.rank(times)
            .into_iter()
            .filter(|f| normalize(&f.function_name).starts_with(prefix))
            .take(n)
            .collect()
    }

    /// Self-time, percent and distinct function count per category
    pub fn category_summary(&self, times: &SelfTimes) -> Vec<CategorySummary> {
        Category::DISPLAY_ORDER
            .iter()
            .filter_map(|&category| {
                let (self_value, functions) = times
                    .iter()
                    .filter(|(name, _)| self.classify(name) == category)
                    .fold((0u64, 0usize), |(sum, count), (_, v)| (sum.saturating_add(v), count + 1));
                (functions > 0).then(|| CategorySummary {
                    category,
                    self_value,
                    self_percent: times.percent_of(self_value),
                    functions,
                })
            })
            .collect()
    }

    /// Full breakdown of one decoded profile
    pub fn report(&self, times: &SelfTimes, n: usize) -> HotspotReport {
        HotspotReport {
            total_ticks: times.total_ticks(),
            functions: times.len(),
            categories: self.category_summary(times),
            top: self.top(times, n),
            top_app: self.top_app(times, n),
        }
    }

    /// Top-N in the backend list shape: normalised name, percent to 2 dp
    pub fn top_functions(&self, times: &SelfTimes, n: usize) -> Vec<TopFunction> {
        times
            .ranked()
            .into_iter()
            .take(n)
            .map(|(name, value)| {
                TopFunction::new(normalize(name).into_owned(), round_to(times.percent_of(value), 2))
            })
            .collect()
    }
}
