// crates/core/src/worker.rs
//! The single background worker that steps progression jobs.
//!
//! Provides:
//! - `Worker` - dequeues jobs one at a time and advances them step by step
//! - `WorkerHandle` - cancellation + join handle for the spawned task
//! - `WorkerEvent` - lifecycle/progress updates broadcast to subscribers
//!
//! The job being stepped lives in a slot owned by the worker. Nothing outside
//! this crate can write to it; readers go through [`SnapshotBuilder`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::StepError;
use crate::job::{JobId, ProgressionJob};
use crate::queue::JobQueue;
use crate::snapshot::SnapshotBuilder;

/// Progress update published by the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// The job left the queue and became the active job.
    Started { job_id: JobId, value: f64 },
    /// One step was applied. `step` counts from 1.
    Stepped { job_id: JobId, step: u64, value: f64 },
    /// All steps ran; the job has been dropped.
    Completed { job_id: JobId, value: f64 },
    /// The job hit an error and was dropped.
    Failed { job_id: JobId, reason: String },
    /// The worker was cancelled while this job was active.
    Abandoned { job_id: JobId, steps_done: u64 },
}

/// Shared slot holding the job currently being stepped.
#[derive(Clone, Default)]
pub(crate) struct ActiveJob {
    slot: Arc<RwLock<Option<ProgressionJob>>>,
}

impl ActiveJob {
    pub(crate) fn get(&self) -> Option<ProgressionJob> {
        self.read().clone()
    }

    pub(crate) fn set(&self, job: ProgressionJob) {
        *self.write() = Some(job);
    }

    pub(crate) fn clear(&self) -> Option<ProgressionJob> {
        self.write().take()
    }

    /// Apply one step to the active job under the write lock.
    pub(crate) fn advance(&self) -> Result<f64, StepError> {
        self.write()
            .as_mut()
            .ok_or(StepError::NoActiveJob)?
            .advance()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<ProgressionJob>> {
        self.slot.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading active job: {e}");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<ProgressionJob>> {
        self.slot.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing active job: {e}");
            e.into_inner()
        })
    }
}

/// How processing of a single job ended.
enum Outcome {
    Completed,
    Cancelled,
}

/// The job worker. Build it, grab a [`SnapshotBuilder`] and any event
/// subscriptions, then [`spawn`](Worker::spawn) it exactly once.
pub struct Worker {
    queue: Arc<JobQueue>,
    active: ActiveJob,
    events: broadcast::Sender<WorkerEvent>,
    #[cfg(test)]
    fault: Option<fn(&ProgressionJob)>,
}

impl Worker {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            queue,
            active: ActiveJob::default(),
            events,
            #[cfg(test)]
            fault: None,
        }
    }

    /// Read-only view over this worker's active job and its queue.
    pub fn snapshots(&self) -> SnapshotBuilder {
        SnapshotBuilder::new(Arc::clone(&self.queue), self.active.clone())
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Spawn the worker loop on the current tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> WorkerHandle {
        let events = self.events.clone();
        let task = tokio::spawn(self.run(cancel.clone()));
        WorkerHandle {
            cancel,
            task,
            events,
        }
    }

    /// Run until `cancel` fires. Errors and panics in a single job are
    /// logged and the loop carries on with the next job.
    pub async fn run(self, cancel: CancellationToken) {
        info!("worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = self.queue.dequeue(|job| self.promote(job)) => job,
            };
            let job_id = job.id();

            let outcome = AssertUnwindSafe(self.process(job, &cancel))
                .catch_unwind()
                .await;
            let last = self.active.clear();

            match outcome {
                Ok(Ok(Outcome::Completed)) => {
                    let value = last.map(|j| j.value()).unwrap_or_default();
                    info!(job_id = %job_id, value, "job completed");
                    self.publish(WorkerEvent::Completed { job_id, value });
                }
                Ok(Ok(Outcome::Cancelled)) => {
                    let steps_done = last.map(|j| j.steps_done()).unwrap_or_default();
                    warn!(job_id = %job_id, steps_done, "worker cancelled, job abandoned");
                    self.publish(WorkerEvent::Abandoned { job_id, steps_done });
                    break;
                }
                Ok(Err(e)) => {
                    error!(job_id = %job_id, error = %e, "job failed, moving on");
                    self.publish(WorkerEvent::Failed {
                        job_id,
                        reason: e.to_string(),
                    });
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(job_id = %job_id, reason = %reason, "job panicked, moving on");
                    self.publish(WorkerEvent::Failed { job_id, reason });
                }
            }
        }

        info!(pending = self.queue.len(), "worker stopped");
    }

    /// Stamp the start date and move the job into the active slot. Called
    /// with the queue lock held.
    fn promote(&self, mut job: ProgressionJob) -> ProgressionJob {
        job.begin(Utc::now().date_naive());
        self.active.set(job.clone());
        job
    }

    async fn process(
        &self,
        job: ProgressionJob,
        cancel: &CancellationToken,
    ) -> Result<Outcome, StepError> {
        let job_id = job.id();
        let steps = job.term_count();
        let pause = job.pause();
        let value = job.value();
        info!(
            job_id = %job_id,
            n = steps,
            d = job.difference(),
            n1 = job.first_term(),
            interval = job.interval(),
            "job started"
        );

        self.publish(WorkerEvent::Started { job_id, value });

        #[cfg(test)]
        if let Some(fault) = self.fault {
            fault(&job);
        }

        for step in 1..=steps {
            let value = self.active.advance()?;
            debug!(job_id = %job_id, step, value, "job stepped");
            self.publish(WorkerEvent::Stepped {
                job_id,
                step,
                value,
            });

            if !suspend(pause, cancel).await {
                return Ok(Outcome::Cancelled);
            }
        }

        Ok(Outcome::Completed)
    }

    fn publish(&self, event: WorkerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Handle to the spawned worker task.
pub struct WorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    events: broadcast::Sender<WorkerEvent>,
}

impl WorkerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the worker and wait for it to unwind. Queued jobs are left in
    /// the queue; only the active job's remaining steps are dropped.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.cancel.cancel();
        self.task.await
    }
}

/// Sleep between steps. Returns `false` if cancelled first.
///
/// A zero pause still yields so other tasks on the runtime get to run.
async fn suspend(pause: Duration, cancel: &CancellationToken) -> bool {
    if pause.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
