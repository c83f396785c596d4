//! Error types for the RakSOR ranking engine

use thiserror::Error;

/// Result type alias for RakSOR operations
pub type Result<T> = std::result::Result<T, RaksorError>;

/// Main error type for the ranking engine
#[derive(Error, Debug)]
pub enum RaksorError {
    /// Attribute schema or target count disagree between cooperating artifacts
    #[error("Schema mismatch in {artifact}: expected {expected}, found {found}")]
    SchemaMismatch {
        artifact: String,
        expected: String,
        found: String,
    },

    #[error("Empty dataset: {0} has no instances")]
    EmptyDataset(String),

    /// Positional mismatch between a ground-truth and a predicted dataset
    #[error("Alignment error between {truth} and {predicted}: {reason}")]
    Alignment {
        truth: String,
        predicted: String,
        reason: String,
    },

    #[error("Model not found at {path}: {reason}")]
    ModelNotFound { path: String, reason: String },

    #[error("Incompatible model file {path}: {reason}")]
    ModelIncompatible { path: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl RaksorError {
    /// Shorthand for a schema mismatch on a named artifact
    pub fn schema_mismatch(
        artifact: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        RaksorError::SchemaMismatch {
            artifact: artifact.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl From<polars::error::PolarsError> for RaksorError {
    fn from(err: polars::error::PolarsError) -> Self {
        RaksorError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for RaksorError {
    fn from(err: serde_json::Error) -> Self {
        RaksorError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RaksorError {
    fn from(err: ndarray::ShapeError) -> Self {
        RaksorError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
