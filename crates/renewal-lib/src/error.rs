//! Error types for the renewal predictor

use crate::models::ModelChoice;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to materialize a classifier at startup
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read model artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to load {model} model from {path:?}: {message}")]
    Model {
        model: ModelChoice,
        path: PathBuf,
        message: String,
    },
}

/// Attribute record failed a numeric bound check
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be 0 or 1, got {value}")]
    NotBinary { field: &'static str, value: u8 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
}

/// Categorical literal outside the closed set for its field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} value {value:?}")]
pub struct UnknownCategory {
    pub field: &'static str,
    pub value: String,
}

/// Request-scoped prediction failure
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{model} model failed: {message}")]
    Inference { model: ModelChoice, message: String },

    #[error("no classifier registered for {0}")]
    ModelUnavailable(ModelChoice),
}
