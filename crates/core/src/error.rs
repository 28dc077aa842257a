// crates/core/src/error.rs
use thiserror::Error;

/// Errors raised while validating a job submission.
///
/// Every variant maps to a `400 Bad Request` at the HTTP boundary. A submission
/// that fails validation is never enqueued.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Request body is not valid JSON: {message}")]
    MalformedBody { message: String },

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Field {field} is not a valid {expected}")]
    NotNumeric {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Field {field} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn not_numeric(field: &'static str, expected: &'static str) -> Self {
        Self::NotNumeric { field, expected }
    }

    pub fn out_of_range(field: &'static str, reason: &'static str) -> Self {
        Self::OutOfRange { field, reason }
    }

    /// The submission field this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::NotNumeric { field, .. }
            | Self::OutOfRange { field, .. } => Some(field),
            Self::MalformedBody { .. } | Self::NotAnObject => None,
        }
    }
}

/// Errors that abort the job currently being stepped by the worker.
///
/// These never reach an HTTP caller: the worker logs them, drops the job and
/// moves on to the next one in the queue.
#[derive(Debug, Error, PartialEq)]
pub enum StepError {
    #[error("Value overflowed at step {step}: {value} + {difference} is not finite")]
    NonFinite {
        step: u64,
        value: f64,
        difference: f64,
    },

    #[error("No active job to advance")]
    NoActiveJob,
}
