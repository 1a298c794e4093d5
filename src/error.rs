//! Error taxonomy for a single arbitration
//!
//! Every failure a decision can hit maps onto one [`ErrorKind`]: the one-shot
//! CLI turns any of them into the failure JSON object and exit code 1, the
//! decision service maps the kind onto an HTTP status.

use thiserror::Error;

/// Classifier artifact errors (loading or inference).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("malformed classifier output: {0}")]
    MalformedOutput(String),

    #[error("no classifier artifact loaded")]
    Unavailable,
}

/// Reference table (schedule CSV) load errors.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to read schedule {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("schedule is empty (no header row)")]
    Empty,

    #[error("schedule is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("schedule line {line}: invalid {column} value '{value}'")]
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("schedule line {line}: duplicate train_id {id}")]
    DuplicateId { line: usize, id: i64 },
}

/// Coarse error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputParse,
    Validation,
    Lookup,
    Model,
}

/// Errors raised while arbitrating one conflict.
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// Payload is not a JSON object.
    #[error("Invalid JSON input: {0}")]
    InputParse(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Field present but not coercible to the expected type or range.
    #[error("Invalid value for field {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Train ID not found in schedule: {0}")]
    NotFound(String),

    #[error("No schedule loaded; train lookups are unavailable")]
    ScheduleUnavailable,

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl ArbiterError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InputParse(_) => ErrorKind::InputParse,
            Self::MissingField(_) | Self::InvalidInput { .. } => ErrorKind::Validation,
            Self::NotFound(_) | Self::ScheduleUnavailable => ErrorKind::Lookup,
            Self::Model(_) => ErrorKind::Model,
        }
    }
}
