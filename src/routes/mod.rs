// HTTP routes: read-only JSON over the measurement store

mod api;
mod error;
mod http;

pub use error::ApiError;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::measurement_repo::MeasurementStore;
use crate::scheduler::SchedulerStats;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn MeasurementStore>,
    pub(crate) targets: Arc<Vec<String>>,
    pub(crate) stats: Arc<SchedulerStats>,
    pub(crate) api: ApiConfig,
}

pub fn app(
    store: Arc<dyn MeasurementStore>,
    targets: Arc<Vec<String>>,
    stats: Arc<SchedulerStats>,
    api: ApiConfig,
) -> Router {
    let state = AppState {
        store,
        targets,
        stats,
        api,
    };
    Router::new()
        .route("/", get(|| async { "sitemonitor: latency poller" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/targets", get(api::targets_handler)) // GET /api/targets
        .route("/api/status", get(api::status_handler)) // GET /api/status
        .route("/api/recent", get(api::recent_handler)) // GET /api/recent?site=
        .route("/api/aggregate/{period}", get(api::aggregate_handler)) // GET /api/aggregate/{period}?site=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
