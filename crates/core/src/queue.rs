// crates/core/src/queue.rs
//! FIFO queue of pending progression jobs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::job::ProgressionJob;

/// Async-safe FIFO of jobs waiting for the worker.
///
/// Uses `std::sync::Mutex` (not `tokio::sync::Mutex`) because the lock is
/// only held for a push, pop or clone and never across an `.await`.
/// Waiting for work goes through [`Notify`] instead.
pub struct JobQueue {
    pending: Mutex<VecDeque<ProgressionJob>>,
    available: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    /// Append a job to the tail. Never blocks on other waiters.
    pub fn enqueue(&self, job: ProgressionJob) {
        let id = job.id();
        let depth = {
            let mut pending = self.lock();
            pending.push_back(job);
            pending.len()
        };
        tracing::debug!(job_id = %id, depth, "job enqueued");
        self.available.notify_one();
    }

    /// Remove the head, waiting until one is available, and hand it to
    /// `promote` while the queue lock is still held.
    ///
    /// Readers going through [`with_pending`](Self::with_pending) see the job
    /// either still queued or already promoted, never in between. Only the
    /// worker calls this.
    ///
    /// Cancel-safe: dropping the returned future before it resolves removes
    /// nothing from the queue.
    pub(crate) async fn dequeue<T>(&self, mut promote: impl FnMut(ProgressionJob) -> T) -> T {
        loop {
            let notified = self.available.notified();
            {
                let mut pending = self.lock();
                if let Some(job) = pending.pop_front() {
                    return promote(job);
                }
            }
            notified.await;
        }
    }

    /// Run `f` against the pending jobs with the queue lock held.
    pub(crate) fn with_pending<T>(&self, f: impl FnOnce(&VecDeque<ProgressionJob>) -> T) -> T {
        f(&self.lock())
    }

    /// Copy of the current contents, head first. Does not remove anything.
    pub fn snapshot(&self) -> Vec<ProgressionJob> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ProgressionJob>> {
        // A panic while holding this lock cannot leave the deque half-updated
        // (every critical section is a single std call), so recover from poison.
        self.pending.lock().unwrap_or_else(|e| {
            tracing::error!("Mutex poisoned on job queue: {e}");
            e.into_inner()
        })
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn job(first_term: i64) -> ProgressionJob {
        ProgressionJob::new(first_term, 1.0, 1, 0.0)
    }

    fn first_terms(jobs: &[ProgressionJob]) -> Vec<i64> {
        jobs.iter().map(|j| j.first_term()).collect()
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo() {
        let queue = JobQueue::new();
        for i in 0..5 {
            queue.enqueue(job(i));
        }

        for i in 0..5 {
            assert_eq!(queue.dequeue(|j| j).await.first_term(), i);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_snapshot_does_not_remove() {
        let queue = JobQueue::new();
        queue.enqueue(job(1));
        queue.enqueue(job(2));
        queue.enqueue(job(3));

        assert_eq!(first_terms(&queue.snapshot()), vec![1, 2, 3]);
        assert_eq!(first_terms(&queue.snapshot()), vec![1, 2, 3]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_with_pending_reads_under_lock() {
        let queue = JobQueue::default();
        assert_eq!(queue.with_pending(|pending| pending.len()), 0);
        queue.enqueue(job(7));
        queue.enqueue(job(8));
        let heads = queue.with_pending(|pending| pending.front().map(|j| j.first_term()));
        assert_eq!(heads, Some(7));
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_dequeue_returns_promoted_value() {
        let queue = JobQueue::new();
        queue.enqueue(job(1));
        queue.enqueue(job(2));

        let promoted = queue.dequeue(|j| j.first_term() * 10).await;
        assert_eq!(promoted, 10);
        assert_eq!(first_terms(&queue.snapshot()), vec![2]);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_enqueue() {
        let queue = Arc::new(JobQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue(|j| j).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.enqueue(job(42));
        let got = tokio::time::timeout(Duration::from_millis(500), consumer)
            .await
            .expect("timeout waiting for dequeue")
            .expect("consumer task panicked");
        assert_eq!(got.first_term(), 42);
    }

    #[tokio::test]
    async fn test_cancelled_dequeue_keeps_items() {
        let queue = JobQueue::new();

        // Nothing queued: the dequeue future times out and is dropped.
        let res = tokio::time::timeout(Duration::from_millis(10), queue.dequeue(|j| j)).await;
        assert!(res.is_err());

        queue.enqueue(job(1));
        queue.enqueue(job(2));
        assert_eq!(first_terms(&queue.snapshot()), vec![1, 2]);
        assert_eq!(queue.dequeue(|j| j).await.first_term(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_and_snapshot() {
        let queue = Arc::new(JobQueue::new());
        let mut producers = Vec::new();
        for p in 0..4 {
            let queue = Arc::clone(&queue);
            producers.push(tokio::spawn(async move {
                for i in 0..50 {
                    queue.enqueue(job(p * 1000 + i));
                    tokio::task::yield_now().await;
                }
            }));
        }

        let reader = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let snap = queue.snapshot();
                    let mut ids: Vec<_> = snap.iter().map(|j| j.id()).collect();
                    ids.sort();
                    ids.dedup();
                    assert_eq!(ids.len(), snap.len(), "snapshot contained duplicates");
                    tokio::task::yield_now().await;
                }
            })
        };

        for p in producers {
            p.await.unwrap();
        }
        reader.await.unwrap();

        let snap = queue.snapshot();
        assert_eq!(snap.len(), 200);
        // Per-producer order is preserved.
        for p in 0..4 {
            let mine: Vec<i64> = snap
                .iter()
                .map(|j| j.first_term())
                .filter(|t| t / 1000 == p)
                .collect();
            assert_eq!(mine, (0..50).map(|i| p * 1000 + i).collect::<Vec<_>>());
        }
    }
}
