//! Error types for request validation, model loading and inference

use std::path::PathBuf;
use thiserror::Error;

/// A request field is absent, out of its domain, or carries an unknown category
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field `{field}` has unknown category `{value}`")]
    UnknownCategory { field: &'static str, value: String },

    #[error("field `{field}` expects a number, got `{value}`")]
    InvalidNumber { field: &'static str, value: String },
}

/// Failure to bring the model artifact up. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("cannot determine model format of {0:?} (expected .onnx or .json)")]
    UnknownFormat(PathBuf),

    #[error("failed to prepare ONNX model: {0}")]
    Onnx(String),

    #[error("failed to parse model artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),
}

/// Failure of a single inference call
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("model execution failed: {0}")]
    Model(String),

    #[error("model produced invalid output: {0}")]
    InvalidOutput(String),
}

impl InferenceError {
    /// Short machine-readable kind used for metric labels and log events
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::InvalidRequest(_) => "invalid_request",
            InferenceError::Model(_) => "model",
            InferenceError::InvalidOutput(_) => "invalid_output",
        }
    }
}
