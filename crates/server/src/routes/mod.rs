// crates/server/src/routes/mod.rs
//! API route handlers for the progression server.

pub mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - POST / - Submit a progression job
/// - GET / - Position-annotated snapshot of active and queued jobs
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new().merge(jobs::router()).with_state(state)
}
