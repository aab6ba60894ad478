//! # Operational HTTP Surface (C7)
//!
//! A narrow axum server exposing liveness, Prometheus metrics and
//! monitor-control routes over the running [`cg_06_supervisor::Supervisor`]
//! (§6). This is operator-facing surface only: it carries no contract or
//! transaction data and has no auth of its own, as it is expected to sit
//! behind the deployment's existing network perimeter.
//!
//! ```text
//! GET  /health                liveness, no dependency checks
//! GET  /metrics               Prometheus text exposition
//! GET  /api/monitor/status    validation queue / rate-limit snapshot
//! GET  /api/monitor/health    per-contract ingester health
//! GET  /api/monitor/events    push-channel delivery counters
//! POST /api/monitor/pause     flips the global pause switch
//! ```

mod middleware;
mod routes;
mod router;
mod state;

pub use router::build_router;
pub use state::AppState;
