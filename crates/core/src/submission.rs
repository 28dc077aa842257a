// crates/core/src/submission.rs
//! Validation of incoming job submissions.
//!
//! A submission is a JSON object with the required fields `n` (term count),
//! `d` (difference), `n1` (first term) and `interval` (seconds between steps).
//! Numeric fields are coerced leniently: integers accept JSON floats (truncated
//! toward zero) and strings holding an integer literal, floats accept any JSON
//! number or a string holding a float literal. Anything else is rejected.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::job::ProgressionJob;

/// Largest magnitude an `n1` may have and still equal its `f64` value.
const MAX_EXACT_FIRST_TERM: i64 = 1 << 53;

/// A validated submission, ready to become a queued [`ProgressionJob`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub term_count: u64,
    pub difference: f64,
    pub first_term: i64,
    pub interval: f64,
}

impl Submission {
    /// Parse and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody {
                message: e.to_string(),
            })?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed JSON value.
    ///
    /// Presence of all four fields is checked before any of them is coerced,
    /// so a body missing `interval` reports the missing field even when
    /// another field is also malformed.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

        let n = required(obj, "n")?;
        let d = required(obj, "d")?;
        let n1 = required(obj, "n1")?;
        let interval = required(obj, "interval")?;

        let term_count = as_integer("n", n)?;
        let difference = as_float("d", d)?;
        let first_term = as_integer("n1", n1)?;
        let interval = as_float("interval", interval)?;

        let term_count = u64::try_from(term_count)
            .map_err(|_| ValidationError::out_of_range("n", "must not be negative"))?;
        if first_term.unsigned_abs() > MAX_EXACT_FIRST_TERM as u64 {
            return Err(ValidationError::out_of_range(
                "n1",
                "magnitude must not exceed 2^53",
            ));
        }
        if !difference.is_finite() {
            return Err(ValidationError::out_of_range("d", "must be finite"));
        }
        if !interval.is_finite() || interval < 0.0 {
            return Err(ValidationError::out_of_range(
                "interval",
                "must be a finite number of seconds, not negative",
            ));
        }
        if Duration::try_from_secs_f64(interval).is_err() {
            return Err(ValidationError::out_of_range("interval", "too large"));
        }

        Ok(Self {
            term_count,
            difference,
            first_term,
            interval,
        })
    }

    /// Build the queued job for this submission.
    pub fn into_job(self) -> ProgressionJob {
        ProgressionJob::new(
            self.first_term,
            self.difference,
            self.term_count,
            self.interval,
        )
    }
}

impl From<Submission> for ProgressionJob {
    fn from(submission: Submission) -> Self {
        submission.into_job()
    }
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::missing(field)),
        Some(value) => Ok(value),
    }
}

fn as_integer(field: &'static str, value: &Value) -> Result<i64, ValidationError> {
    let invalid = || ValidationError::not_numeric(field, "integer");
    match value {
        Value::Number(num) => {
            if let Some(i) = num.as_i64() {
                return Ok(i);
            }
            // Floats truncate toward zero; anything outside i64 is out of range.
            let f = num.as_f64().ok_or_else(invalid)?;
            let truncated = f.trunc();
            if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(truncated as i64)
            } else {
                Err(ValidationError::out_of_range(field, "does not fit a 64-bit integer"))
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn as_float(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::not_numeric(field, "number");
    match value {
        Value::Number(num) => num.as_f64().ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
