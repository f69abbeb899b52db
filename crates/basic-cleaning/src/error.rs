//! Custom error types for the basic cleaning step.
//!
//! This module provides the error hierarchy using `thiserror`. Nothing in
//! the crate retries or recovers: every variant is propagated to the caller
//! and, from the binary, aborts the process with a nonzero status.
//!
//! Errors are serializable so they can be embedded in run records.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning step.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A required column exists but does not hold numbers.
    #[error("Column '{column}' must be numeric, found {dtype}")]
    InvalidColumnType { column: String, dtype: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An artifact reference or name could not be parsed.
    #[error("Invalid artifact name '{0}'")]
    InvalidArtifactName(String),

    /// The requested artifact (or version) does not exist in the store.
    #[error("Artifact '{name}:{version}' not found")]
    ArtifactNotFound { name: String, version: String },

    /// The artifact store rejected or failed an operation.
    #[error("Artifact store error: {0}")]
    ArtifactStore(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (for the remote store, only with "remote" feature).
    #[cfg(feature = "remote")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, recorded alongside failed runs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidColumnType { .. } => "INVALID_COLUMN_TYPE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidArtifactName(_) => "INVALID_ARTIFACT_NAME",
            Self::ArtifactNotFound { .. } => "ARTIFACT_NOT_FOUND",
            Self::ArtifactStore(_) => "ARTIFACT_STORE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "remote")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the error comes from the dataset itself rather than the
    /// surrounding I/O (missing or mistyped required columns).
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::InvalidColumnType { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Io(e).with_context(context))
    }
}
