// crates/core/src/lib.rs
//! Progression job queue: submissions, a FIFO queue, a single stepping
//! worker, and position-annotated snapshots of both.
//!
//! Control flow: [`Submission`] → [`JobQueue::enqueue`] → [`Worker`] dequeues
//! and steps the job → the job is dropped. Readers go through
//! [`SnapshotBuilder::build`].

pub mod error;
pub mod job;
pub mod queue;
pub mod snapshot;
pub mod submission;
pub mod worker;

pub use error::*;
pub use job::{JobId, JobStatus, ProgressionJob};
pub use queue::JobQueue;
pub use snapshot::{PositionedJob, SnapshotBuilder};
pub use submission::Submission;
pub use worker::{Worker, WorkerEvent, WorkerHandle};
