// crates/core/src/job.rs
//! The progression job entity.
//!
//! A [`ProgressionJob`] carries the immutable parameters of a submission (first
//! term, difference, term count, interval) plus the runtime state the worker
//! mutates while stepping it. Field names on the wire follow the submission
//! format: `n`, `d`, `n1`, `interval`, `value`, `status`, `start`.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use ulid::Ulid;

use crate::error::StepError;

/// Identifier assigned to a job when it is created. Only used for log and
/// event correlation; it is not part of the HTTP representation.
pub type JobId = Ulid;

/// Lifecycle status of a job. There is no completed state: a finished job is
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    #[serde(rename = "queue")]
    Queued,
    #[serde(rename = "process")]
    Processing,
}

/// One arithmetic progression to be stepped through by the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionJob {
    #[serde(skip)]
    id: JobId,
    #[serde(rename = "n")]
    term_count: u64,
    #[serde(rename = "d")]
    difference: f64,
    #[serde(rename = "n1")]
    first_term: i64,
    interval: f64,
    value: f64,
    status: JobStatus,
    #[serde(
        rename = "start",
        serialize_with = "start_date::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    started_at: Option<NaiveDate>,
    #[serde(skip)]
    steps_done: u64,
}

impl ProgressionJob {
    /// Create a queued job whose running value starts at `first_term`.
    ///
    /// `interval` is in seconds. Callers accepting external input should go
    /// through [`crate::Submission`], which rejects negative or non-finite
    /// intervals before a job is built. It also rejects a `first_term` whose
    /// magnitude exceeds 2^53; past that, `value` starts out rounded.
    pub fn new(first_term: i64, difference: f64, term_count: u64, interval: f64) -> Self {
        Self {
            id: Ulid::new(),
            term_count,
            difference,
            first_term,
            interval,
            value: first_term as f64,
            status: JobStatus::Queued,
            started_at: None,
            steps_done: 0,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn first_term(&self) -> i64 {
        self.first_term
    }

    pub fn difference(&self) -> f64 {
        self.difference
    }

    pub fn term_count(&self) -> u64 {
        self.term_count
    }

    /// Seconds to suspend between steps, as submitted.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// The running total.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<NaiveDate> {
        self.started_at
    }

    /// Number of steps applied so far.
    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    /// Suspension between steps. An interval that cannot be represented as a
    /// [`Duration`] is treated as no suspension at all.
    pub fn pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval).unwrap_or(Duration::ZERO)
    }

    /// Move the job from queued to processing, stamping the start date.
    /// The start date is only ever set once.
    pub(crate) fn begin(&mut self, today: NaiveDate) {
        self.status = JobStatus::Processing;
        if self.started_at.is_none() {
            self.started_at = Some(today);
        }
    }

    /// Apply one step: add the difference to the running value.
    ///
    /// A step whose result is not finite is rejected and leaves the value
    /// untouched. Returns the new value.
    pub(crate) fn advance(&mut self) -> Result<f64, StepError> {
        let next = self.value + self.difference;
        if !next.is_finite() {
            return Err(StepError::NonFinite {
                step: self.steps_done + 1,
                value: self.value,
                difference: self.difference,
            });
        }
        self.value = next;
        self.steps_done += 1;
        Ok(next)
    }
}

mod start_date {
    use chrono::NaiveDate;
    use serde::Serializer;

    const FORMAT: &str = "%Y/%m/%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.collect_str(&date.format(FORMAT)),
            None => s.serialize_none(),
        }
    }
}
