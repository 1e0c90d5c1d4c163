//! Custom error types for the cleaning and mining stages.
//!
//! This module provides the error hierarchy using `thiserror` so that both
//! the preprocessor and the rule miner report failures with context.
//!
//! Errors are serializable as `{ code, message }`, which keeps the JSON
//! output mode of the CLI machine-readable even on failure.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum MiningError {
    /// Required column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A value could not be interpreted for its column.
    #[error("Invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },

    /// Data cleaning failed.
    #[error("Failed to clean data: {0}")]
    CleaningFailed(String),

    /// Frequent itemset mining failed.
    #[error("Failed to mine rules: {0}")]
    MiningFailed(String),

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

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
        source: Box<MiningError>,
    },
}

impl MiningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MiningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::MiningFailed(_) => "MINING_FAILED",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Recover a `MiningError` raised inside an `anyhow` helper, or wrap the
    /// message with `wrap` when the failure came from elsewhere.
    pub(crate) fn from_anyhow(err: anyhow::Error, wrap: impl FnOnce(String) -> Self) -> Self {
        match err.downcast::<MiningError>() {
            Ok(mining) => mining,
            Err(err) => match err.downcast::<polars::error::PolarsError>() {
                Ok(polars) => MiningError::Polars(polars),
                Err(err) => wrap(err.to_string()),
            },
        }
    }

    /// Check if this error comes from the shape of the input file rather
    /// than from a processing failure.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::NoValidValues(_) | Self::InvalidValue { .. } => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for MiningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("MiningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, MiningError>;

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
        self.map_err(|e| MiningError::Polars(e).with_context(context))
    }
}
