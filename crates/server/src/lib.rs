//! HTTP service exposing JVM triage reports

pub mod api;
pub mod config;
