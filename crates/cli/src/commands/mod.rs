//! Subcommand implementations

pub mod bottleneck;
pub mod diagnose;
pub mod diff;
pub mod fleet;
pub mod health;
pub mod hotspots;
pub mod triage;
