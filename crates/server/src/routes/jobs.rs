// crates/server/src/routes/jobs.rs
//! API routes for progression jobs.
//!
//! - POST / - Validate a submission and append it to the queue
//! - GET / - Active job plus queued jobs, annotated with positions

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use progression_core::{PositionedJob, Submission};

use crate::error::ApiResult;
use crate::state::AppState;

/// POST / - Enqueue a new progression job.
///
/// The body is parsed as JSON regardless of `Content-Type`. Responds 200 with
/// an empty body once the job is queued.
async fn submit_job(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<StatusCode> {
    let job = Submission::from_slice(&body)?.into_job();
    tracing::info!(
        job_id = %job.id(),
        n = job.term_count(),
        d = job.difference(),
        n1 = job.first_term(),
        interval = job.interval(),
        "job submitted"
    );
    state.queue.enqueue(job);
    Ok(StatusCode::OK)
}

/// GET / - List the active job and every queued job.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<PositionedJob>> {
    Json(state.snapshots.build())
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_jobs).post(submit_job))
}
