//! # Per-Contract Ingester (C5)
//!
//! Owns one monitored contract's ingestion lifecycle end to end: backfill
//! from the last processed block, primary live ingestion via a block
//! watcher, automatic fallback to polling on watcher failure, periodic
//! reconnection attempts, and a bounded bring-up retry budget after which
//! the supervisor is notified (§4.2, §5).

mod ingester;
mod pipeline;
mod ports;
mod retry;

pub use ingester::{Ingester, IngesterFailureHandler};
pub use pipeline::Pipeline;
pub use ports::{
    ChainBlock, ChainError, ChainEventSource, ChainReceipt, ChainTx, HistoryError, HistorySource, HistoryTx,
};
pub use retry::{
    bring_up_backoff, write_conflict_jitter, BRING_UP_BASE_DELAY, BRING_UP_MAX_ATTEMPTS, BRING_UP_MAX_DELAY,
    BRING_UP_MULTIPLIER, POLL_FALLBACK_INTERVAL, POLL_IDLE_INTERVAL, RECONNECT_INTERVAL,
    WRITE_CONFLICT_JITTER_MAX, WRITE_CONFLICT_JITTER_MIN,
};
