//! # Monitor Supervisor (C6)
//!
//! Starts and stops per-contract ingesters (§4.3), tracks which ones are
//! alive via `JoinHandle::is_finished()`, raises `MONITORING_FAILURE`
//! once an ingester's bring-up retry budget is exhausted, and owns the
//! single global pause switch the operational HTTP surface exposes over
//! `POST /api/monitor/pause`.

mod control;
mod supervisor;

pub use supervisor::{
    EventStats, MonitorControl, MonitorStatus, Supervisor, SupervisorError, SupervisorHealth,
};
