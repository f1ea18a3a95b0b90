//! Custom error types for the ingestion pipeline.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! upload, cleaning and profiling paths.
//!
//! Errors are serializable so the upload handler can forward a single
//! `{code, message}` payload to the client.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the ingestion pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Declared file type is not one of the supported formats.
    #[error("Unsupported file type: '{0}'. Supported types: csv, json")]
    UnsupportedFormat(String),

    /// File content could not be parsed as the declared format.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The stored file backing a dataset record is gone.
    #[error("Dataset file not found: {}", .0.display())]
    DatasetFileMissing(PathBuf),

    /// No dataset record exists for the given id.
    #[error("Dataset {0} not found")]
    DatasetNotFound(u64),

    /// The persistence collaborator rejected a write or read.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Column was not found in the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for the upload handler.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::DatasetFileMissing(_) => "DATASET_FILE_MISSING",
            Self::DatasetNotFound(_) => "DATASET_NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The innermost error, with all context layers peeled off.
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the error was caused by the uploaded file itself rather than
    /// by the service (bad format tag or unparsable content).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.root(),
            Self::UnsupportedFormat(_) | Self::MalformedInput(_)
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Why statistics for a single column could not be computed.
///
/// Never surfaced to callers: the profiler degrades the column to a minimal
/// record and keeps going.
#[derive(Error, Debug)]
pub enum ColumnStatsError {
    /// Column dtype has no statistics branch (lists, structs, binary...).
    #[error("unsupported column type {dtype} for column '{column}'")]
    UnsupportedType { column: String, dtype: String },

    /// Polars failed while extracting the values.
    #[error("failed to read values of column '{column}': {source}")]
    Extraction {
        column: String,
        #[source]
        source: polars::error::PolarsError,
    },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

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
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::UnsupportedFormat("xlsx".to_string()).error_code(),
            "UNSUPPORTED_FORMAT"
        );
        assert_eq!(
            PipelineError::DatasetNotFound(7).error_code(),
            "DATASET_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_client_error() {
        assert!(PipelineError::MalformedInput("bad".to_string()).is_client_error());
        assert!(PipelineError::UnsupportedFormat("txt".to_string()).is_client_error());
        assert!(!PipelineError::Storage("disk full".to_string()).is_client_error());
    }

    #[test]
    fn test_client_error_through_context() {
        let error = PipelineError::MalformedInput("bad json".to_string())
            .with_context("Failed to process upload");
        assert!(error.is_client_error());
        assert!(matches!(error.root(), PipelineError::MalformedInput(_)));
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::DatasetFileMissing(PathBuf::from("uploads/abc.csv"));
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("DATASET_FILE_MISSING"));
        assert!(json.contains("abc.csv"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::ColumnNotFound("amount".to_string())
            .with_context("During imputation");
        assert!(error.to_string().contains("During imputation"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND"); // Preserves original code
    }

    #[test]
    fn test_io_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let error = result.context("Saving upload").unwrap_err();
        assert_eq!(error.error_code(), "IO_ERROR");
        assert!(error.to_string().starts_with("Saving upload"));
    }
}
