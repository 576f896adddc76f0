//! Error types for the triage library

use thiserror::Error;

/// Errors raised while parsing threshold overrides
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("invalid value for threshold '{key}': '{value}' is not a number")]
    InvalidValue { key: String, value: String },
}

/// Library-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
    #[error("{backend} query failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unknown profile type: {0}. Valid: cpu, alloc, mutex, wall")]
    UnknownProfileKind(String),
    #[error("Unknown report section: {0}. Valid: all, health, http, profiles, alerts")]
    UnknownSection(String),
}

pub type Result<T> = std::result::Result<T, Error>;
