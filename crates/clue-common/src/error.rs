//! Error types for CLUE.
//!
//! Each crate module owns a narrow error enum; this is the categorized,
//! caller-facing error those convert into. Codes are stable and grouped:
//! - 10-19: Configuration errors
//! - 20-29: Model construction errors
//! - 30-39: Inference errors
//! - 40-49: Agent and expert errors
//! - 60-69: I/O errors
//!
//! Structured form:
//! ```json
//! { "code": 31, "category": "inference", "message": "illegal elimination order at D: ..." }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for CLUE operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid experiment, agent, or expert configuration.
    Config,
    /// Invalid influence diagram, table, or assignment.
    Model,
    /// Exact inference and decision-network solving.
    Inference,
    /// Agent or expert runtime failures.
    Agent,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Agent => write!(f, "agent"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for CLUE.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidParameter { field: String, message: String },

    // Model errors (20-29)
    #[error("model error: {0}")]
    Model(String),

    #[error("unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("value {value} is not in the domain of {variable}")]
    UnknownValue { variable: String, value: String },

    // Inference errors (30-39)
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("illegal elimination order: {0}")]
    IllegalOrder(String),

    #[error("observations have zero probability")]
    ZeroEvidence,

    // Agent errors (40-49)
    #[error("agent error: {0}")]
    Agent(String),

    #[error("expert error: {0}")]
    Expert(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidParameter { .. } => 11,
            Error::Model(_) => 20,
            Error::UnknownVariable { .. } => 21,
            Error::UnknownValue { .. } => 22,
            Error::Inference(_) => 30,
            Error::IllegalOrder(_) => 31,
            Error::ZeroEvidence => 32,
            Error::Agent(_) => 40,
            Error::Expert(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidParameter { .. } => ErrorCategory::Config,
            Error::Model(_) | Error::UnknownVariable { .. } | Error::UnknownValue { .. } => {
                ErrorCategory::Model
            }
            Error::Inference(_) | Error::IllegalOrder(_) | Error::ZeroEvidence => {
                ErrorCategory::Inference
            }
            Error::Agent(_) | Error::Expert(_) => ErrorCategory::Agent,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether retrying with different inputs can succeed.
    ///
    /// Configuration and model errors are programming or authoring errors:
    /// the same call fails again until the input is fixed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidParameter { .. } => false,
            Error::Model(_) | Error::UnknownVariable { .. } | Error::UnknownValue { .. } => false,
            Error::IllegalOrder(_) => false,
            Error::Inference(_) | Error::ZeroEvidence => true,
            Error::Agent(_) | Error::Expert(_) => false,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Machine-readable summary of this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            category: self.category(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
        }
    }
}

/// Serializable error summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_grouped_by_category() {
        let cases = vec![
            (Error::Config("x".into()), ErrorCategory::Config, 10),
            (
                Error::UnknownVariable { name: "C".into() },
                ErrorCategory::Model,
                21,
            ),
            (Error::ZeroEvidence, ErrorCategory::Inference, 32),
            (Error::Expert("x".into()), ErrorCategory::Agent, 41),
        ];
        for (err, category, code) in cases {
            assert_eq!(err.category(), category);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let report = Error::IllegalOrder("D before C".into()).report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], 31);
        assert_eq!(json["category"], "inference");
        assert_eq!(json["recoverable"], false);
    }
}
