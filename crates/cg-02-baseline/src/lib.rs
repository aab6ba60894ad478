//! # Baseline Job (C7)
//!
//! Recomputes each monitored contract's rolling 7-day gas and value
//! baseline independently of ingestion, so a slow recomputation pass
//! never stalls the transaction path (§4.6).

mod job;
mod stats;

pub use job::{BaselineError, BaselineJob, BaselineRunSummary};
pub use stats::{compute, BaselineStats, MIN_SAMPLES};
