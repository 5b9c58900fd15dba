//! Error types for the maxi-gsc library.

use crate::detectors::Detector;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum GscError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Detector mismatch: expected {expected}, got {actual}")]
    DetectorMismatch { expected: Detector, actual: Detector },

    #[error("Bin edge mismatch: {0}")]
    EdgeMismatch(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Missing header keyword '{0}'")]
    MissingKeyword(String),

    #[error("Invalid value for header keyword '{key}': {reason}")]
    InvalidKeyword { key: String, reason: String },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, GscError>;
