// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;

use progression_core::{JobQueue, SnapshotBuilder};

/// Shared application state accessible from all route handlers.
///
/// Handlers can only append to the queue and read snapshots. Mutation of the
/// active job belongs to the worker.
pub struct AppState {
    /// Pending jobs; submissions are appended here.
    pub queue: Arc<JobQueue>,
    /// Read-only view over the worker's active job plus the queue.
    pub snapshots: SnapshotBuilder,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(queue: Arc<JobQueue>, snapshots: SnapshotBuilder) -> Arc<Self> {
        Arc::new(Self { queue, snapshots })
    }
}
