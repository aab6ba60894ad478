//! Shared state handed to every operational route.

use cg_06_supervisor::MonitorControl;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<dyn MonitorControl>,
    pub now: Arc<dyn Fn() -> i64 + Send + Sync>,
    /// `INSTANCE_ID` from config, surfaced by `GET /metrics` (§6).
    pub instance_id: String,
}

impl AppState {
    #[must_use]
    pub fn new(monitor: Arc<dyn MonitorControl>, now: Arc<dyn Fn() -> i64 + Send + Sync>, instance_id: String) -> Self {
        Self {
            monitor,
            now,
            instance_id,
        }
    }
}
