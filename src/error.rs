//! Error types for the textclf experiment runner

use thiserror::Error;

/// Result type alias for textclf operations
pub type Result<T> = std::result::Result<T, TextClfError>;

/// Main error type for the runner and its ML layer
#[derive(Error, Debug)]
pub enum TextClfError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Unknown feature set: {0}")]
    UnknownFeature(String),

    #[error("Unknown classifier: {0}")]
    UnknownClassifier(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TextClfError {
    pub(crate) fn invalid_parameter(
        name: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        TextClfError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for TextClfError {
    fn from(err: polars::error::PolarsError) -> Self {
        TextClfError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TextClfError {
    fn from(err: serde_json::Error) -> Self {
        TextClfError::SerializationError(err.to_string())
    }
}

impl From<walkdir::Error> for TextClfError {
    fn from(err: walkdir::Error) -> Self {
        TextClfError::DataError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TextClfError {
    fn from(err: ndarray::ShapeError) -> Self {
        TextClfError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
