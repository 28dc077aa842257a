// crates/server/src/lib.rs
//! Progression server library.
//!
//! Axum HTTP front end for the progression job queue: `POST /` submits a job,
//! `GET /` lists the active job and the queue. [`serve`] owns the process
//! lifecycle: it starts the single worker, serves HTTP until the shutdown
//! future resolves, then cancels the worker and waits for it.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use progression_core::{JobQueue, Worker};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - Job routes (submit, list)
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the server on `listener` until `shutdown` resolves.
///
/// The worker is started before the first request is accepted and is
/// cancelled only after the HTTP server has drained. Jobs still queued at
/// that point are dropped with the process.
pub async fn serve<F>(listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let queue = Arc::new(JobQueue::new());
    let worker = Worker::new(Arc::clone(&queue));
    let state = AppState::new(Arc::clone(&queue), worker.snapshots());
    let worker = worker.spawn(CancellationToken::new());

    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%addr, "Progression server listening");

    let served = axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await;

    tracing::info!(pending = queue.len(), "HTTP server stopped, stopping worker");
    worker.shutdown().await.context("worker task failed")?;
    served.context("HTTP server error")?;
    Ok(())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_app() -> Router {
        let queue = Arc::new(JobQueue::new());
        let worker = Worker::new(Arc::clone(&queue));
        create_app(AppState::new(queue, worker.snapshots()))
    }

    #[test]
    fn test_create_app() {
        // Should not panic
        let _app = test_app();
    }

    #[tokio::test]
    async fn test_404_for_unknown_route() {
        let response = test_app()
            .oneshot(Request::builder().uri("/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let allow_origin = response.headers().get("access-control-allow-origin");
        assert!(allow_origin.is_some());
        assert_eq!(allow_origin.unwrap(), "*");
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("server did not shut down")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
