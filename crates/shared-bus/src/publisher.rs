//! # Push Channel Publisher
//!
//! Defines the publishing side of the push channel (§4.3, §6).

use crate::events::{EventFilter, PushEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing events to the push channel.
///
/// The supervisor's `emit(topic, payload)` (§4.3) is this trait's
/// `publish` — delivery is best-effort, at-least-once, and the channel
/// does not buffer for disconnected clients beyond its own broadcast
/// capacity (§6).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of active subscribers that
    /// received it (0 if the event was dropped for lack of receivers).
    async fn publish(&self, event: PushEvent) -> usize;

    fn events_published(&self) -> u64;

    /// Clients currently subscribed to the push channel (§6 `/metrics`
    /// `clientsCount`).
    fn client_count(&self) -> usize;
}

/// In-process push bus backed by `tokio::sync::broadcast`.
///
/// Suitable for single-instance deployments. When `REDIS_URL` is
/// configured, `node-runtime` wraps this bus with a Redis-backed relay so
/// multiple instances share one logical topic bus (§6, §9 "push fan-out
/// across instances").
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PushEvent>,
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter; returns a handle that
    /// cleans up its subscription-count entry on drop.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}:{:?}", filter.contract, filter.topics);

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(topic_key.clone()).or_insert(0) += 1;
        }

        debug!(contract = ?filter.contract, topics = ?filter.topics, "new push subscription");
        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: PushEvent) -> usize {
        let topic = event.topic();
        let contract = event.contract_address().clone();

        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(?topic, %contract, receivers = receiver_count, "push event published");
                receiver_count
            }
            Err(_) => {
                warn!(?topic, %contract, "push event dropped (no subscribers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    fn client_count(&self) -> usize {
        self.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PushTopic;
    use shared_types::entities::{Address, Contract, Network};

    fn contract_update(addr: &str) -> PushEvent {
        PushEvent::ContractUpdate {
            contract_address: Address::from(addr),
            contract: Contract::new("c1".into(), Address::from(addr), Network::Testnet, 0),
        }
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_drops_event() {
        let bus = InMemoryEventBus::new();
        let receivers = bus.publish(contract_update("0xabc")).await;
        assert_eq!(receivers, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = InMemoryEventBus::new();
        let _sub = bus.subscribe(EventFilter::all());
        let receivers = bus.publish(contract_update("0xabc")).await;
        assert_eq!(receivers, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_with_mixed_filters_all_count() {
        let bus = InMemoryEventBus::new();
        let _sub1 = bus.subscribe(EventFilter::all());
        let _sub2 = bus.subscribe(EventFilter::for_contract(Address::from("0xabc")));
        let _sub3 = bus.subscribe(EventFilter::all().with_topics(vec![PushTopic::ContractUpdate]));

        let receivers = bus.publish(contract_update("0xabc")).await;
        assert_eq!(receivers, 3);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[test]
    fn default_bus_has_default_capacity() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
    }
}
