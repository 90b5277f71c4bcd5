//! Error types for survey-insight.
//!
//! Analysis failures are expected, recoverable conditions: a column with no
//! usable values, too few observations for a test, a quantity that cannot be
//! computed, or a selection that does not match the dataset. They are
//! returned as [`SurveyError`] values so the caller can render a specific
//! message. Ingestion and configuration failures share the same type.

use thiserror::Error;

/// All errors produced by survey-insight operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    /// A numeric column has zero non-missing values after filtering.
    #[error("column '{column}' has no valid numeric data")]
    NoData { column: String },

    /// Fewer observations than the requested test requires.
    #[error("need at least {min_required} observations, got {actual}")]
    InsufficientData { min_required: usize, actual: usize },

    /// A derived quantity cannot be computed from the given inputs.
    #[error("result is undefined: {reason}")]
    Undefined { reason: String },

    /// The caller asked for a column or column/role combination that does
    /// not exist or does not fit the operation.
    #[error("invalid selection '{column}': {reason}")]
    InvalidSelection { column: String, reason: String },

    /// Column lengths disagree.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// CSV parsing failed.
    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },

    /// Excel workbook could not be read.
    #[error("Excel read error: {0}")]
    Excel(String),

    /// Configuration is malformed or out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(String),

    /// A report could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SurveyError {
    /// Shorthand for a missing column.
    pub fn column_not_found(name: &str) -> Self {
        Self::InvalidSelection {
            column: name.to_string(),
            reason: "column not found".to_string(),
        }
    }

    /// Shorthand for [`SurveyError::Undefined`].
    pub fn undefined(reason: impl Into<String>) -> Self {
        Self::Undefined {
            reason: reason.into(),
        }
    }

    /// Returns `true` for the analysis signals (`NoData`, `InsufficientData`,
    /// `Undefined`, `InvalidSelection`) that a presentation layer should show
    /// as a message rather than treat as a failure of the application.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoData { .. }
                | Self::InsufficientData { .. }
                | Self::Undefined { .. }
                | Self::InvalidSelection { .. }
        )
    }
}

impl From<std::io::Error> for SurveyError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for SurveyError {
    fn from(e: csv::Error) -> Self {
        let line = e
            .position()
            .map_or(0, |pos| pos.line() as usize);
        Self::CsvParse {
            line,
            message: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for SurveyError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<serde_json::Error> for SurveyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SurveyError>;
