// crates/core/src/snapshot.rs
//! Position-annotated, read-only view of the active job plus the queue.

use std::sync::Arc;

use serde::Serialize;

use crate::job::ProgressionJob;
use crate::queue::JobQueue;
use crate::worker::ActiveJob;

/// A job together with its place in line. Position 0 is the active job when
/// one exists, otherwise the head of the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedJob {
    #[serde(flatten)]
    pub job: ProgressionJob,
    pub position: usize,
}

/// Builds snapshots for readers. Cheap to clone; never mutates anything.
#[derive(Clone)]
pub struct SnapshotBuilder {
    queue: Arc<JobQueue>,
    active: ActiveJob,
}

impl SnapshotBuilder {
    pub(crate) fn new(queue: Arc<JobQueue>, active: ActiveJob) -> Self {
        Self { queue, active }
    }

    /// The job currently being stepped, if any.
    pub fn active(&self) -> Option<ProgressionJob> {
        self.active.get()
    }

    /// Jobs still waiting, head first.
    pub fn queued(&self) -> Vec<ProgressionJob> {
        self.queue.snapshot()
    }

    /// Active job (if any) followed by the queue, numbered from 0.
    ///
    /// Both are read under the queue lock, the same lock the worker holds
    /// while promoting the head into the active slot. A job is therefore
    /// listed exactly once from enqueue until it finishes.
    ///
    /// Lock order: queue, then active slot.
    pub fn build(&self) -> Vec<PositionedJob> {
        self.queue.with_pending(|pending| {
            self.active
                .get()
                .into_iter()
                .chain(pending.iter().cloned())
                .enumerate()
                .map(|(position, job)| PositionedJob { job, position })
                .collect()
        })
    }
}
