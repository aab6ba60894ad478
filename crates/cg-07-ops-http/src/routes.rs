//! Handlers for the five operational routes (§6).

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
}

/// `GET /health`: process liveness only, no downstream dependency checks.
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// `GET /metrics`: Prometheus text exposition of the counters `cg-telemetry`
/// already registers, plus the three fields §6 enumerates for this route —
/// `clientsCount`, `instanceId`, `timestamp` — refreshed on every scrape
/// from the supervisor's live event stats rather than read lazily.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let now = (state.now)();
    let clients_connected = state.monitor.event_stats().clients_connected;
    cg_telemetry::record_scrape(&state.instance_id, clients_connected, now);

    match cg_telemetry::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /api/monitor/status`: validation queue depth, budget and rate-limit
/// snapshot.
pub async fn monitor_status(State(state): State<AppState>) -> impl IntoResponse {
    let now = (state.now)();
    Json(state.monitor.queue_stats(now).await)
}

/// `GET /api/monitor/health`: per-contract ingester health.
pub async fn monitor_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.monitor.health().await)
}

/// `GET /api/monitor/events`: push-channel delivery counters.
pub async fn monitor_events(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.monitor.event_stats())
}

#[derive(Debug, Deserialize)]
pub struct PauseRequest {
    pub paused: bool,
}

#[derive(Debug, Serialize)]
pub struct PauseResponse {
    pub paused: bool,
}

/// `POST /api/monitor/pause`: flips the global validation-queue pause
/// switch, body `{"paused": bool}`.
pub async fn pause(
    State(state): State<AppState>,
    Json(body): Json<PauseRequest>,
) -> impl IntoResponse {
    state.monitor.pause(body.paused).await;
    Json(PauseResponse {
        paused: body.paused,
    })
}
