//! Builds the axum [`Router`] for the operational HTTP surface (§6):
//! liveness, metrics, and the monitor-control routes, wrapped in CORS,
//! request tracing and a blanket timeout.

use crate::middleware::{create_cors_layer, REQUEST_TIMEOUT};
use crate::routes;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// `frontend_url` comes straight from the runtime's validated config; see
/// [`create_cors_layer`] for the fallback when it is absent.
pub fn build_router(state: AppState, frontend_url: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/api/monitor/status", get(routes::monitor_status))
        .route("/api/monitor/health", get(routes::monitor_health))
        .route("/api/monitor/events", get(routes::monitor_events))
        .route("/api/monitor/pause", post(routes::pause))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(create_cors_layer(frontend_url))
        .with_state(state)
}
