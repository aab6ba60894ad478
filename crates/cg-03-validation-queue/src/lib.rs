//! # Validation Queue (C3)
//!
//! A bounded, single-worker priority FIFO that fronts the external LLM
//! validator (§4.4): findings are enqueued by severity-derived priority,
//! validated one at a time under a rate limit and a daily cost budget,
//! and either turned into an [`shared_types::entities::Alert`] or simply
//! marked validated with no user-visible effect.
//!
//! This is the explicit backpressure point for the LLM integration (§5):
//! the per-contract ingester never blocks on it, it only enqueues.

mod queue;
mod rate;
mod types;
mod validator;

pub use queue::{TickOutcome, ValidationEngine, ValidationQueue};
pub use rate::{Budget, RateWindow, COST_PER_ITEM, DAILY_BUDGET, RATE_LIMIT_PER_WINDOW, RATE_WINDOW_SECONDS};
pub use types::{Priority, QueueItem, QueueStats};
pub use validator::{
    FindingPayload, HttpValidator, ValidationRequest, Validator, ValidatorError, ValidatorOutcome,
    VALIDATOR_TIMEOUT,
};
