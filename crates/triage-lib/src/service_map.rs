//! Container name to profiling application name mapping
//!
//! Metrics are keyed by container or service name while profiles are keyed by
//! the application name the profiler was started with. Names with no entry
//! map to themselves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct ServiceMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping; a later entry for the same profiling name wins in reverse
    pub fn insert(&mut self, service: impl Into<String>, profiling_name: impl Into<String>) {
        let service = service.into();
        let profiling_name = profiling_name.into();
        self.reverse.insert(profiling_name.clone(), service.clone());
        self.forward.insert(service, profiling_name);
    }

    /// Profiling name for a container or service name
    pub fn profiling_name<'a>(&'a self, service: &'a str) -> &'a str {
        self.forward.get(service).map_or(service, String::as_str)
    }

    /// Container or service name for a profiling name
    pub fn service_name<'a>(&'a self, profiling_name: &'a str) -> &'a str {
        self.reverse.get(profiling_name).map_or(profiling_name, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl From<HashMap<String, String>> for ServiceMap {
    fn from(entries: HashMap<String, String>) -> Self {
        let mut map = Self::new();
        for (service, profiling_name) in entries {
            map.insert(service, profiling_name);
        }
        map
    }
}

impl From<ServiceMap> for HashMap<String, String> {
    fn from(map: ServiceMap) -> Self {
        map.forward
    }
}

impl<S: Into<String>, P: Into<String>> FromIterator<(S, P)> for ServiceMap {
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (service, profiling_name) in iter {
            map.insert(service, profiling_name);
        }
        map
    }
}
