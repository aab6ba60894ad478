//! # Shared Bus - Push Channel for Browser Clients
//!
//! Implements the in-process push channel the supervisor fans events out
//! over (§4.3, §6): an in-memory broadcast bus that the ops HTTP surface's
//! WS/SSE handlers subscribe to, filtered per contract and/or topic.
//!
//! ## Delivery model
//!
//! - Best-effort, at-least-once to clients connected at publish time.
//! - No buffering for disconnected clients beyond the broadcast channel's
//!   own ring capacity; a lagged subscriber drops the oldest unread events
//!   rather than blocking the publisher.
//! - When `REDIS_URL` is configured, `node-runtime` layers a Redis pub/sub
//!   relay on top of this bus so multiple instances share one logical
//!   topic space (§6, §9).

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, PushEvent, PushTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_matches_documented_value() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
