//! Optional Redis pub/sub relay for the push channel (§6, §9): when
//! `REDIS_URL` is configured, every event published locally is also
//! republished on a Redis channel, and a background task relays whatever
//! other instances publish back into this process's local bus. Instances
//! that never set `REDIS_URL` just use `InMemoryEventBus` directly and
//! never construct this type.

use async_trait::async_trait;
use redis::AsyncCommands;
use shared_bus::{EventPublisher, InMemoryEventBus, PushEvent};
use std::sync::Arc;
use tracing::{error, warn};

const RELAY_CHANNEL: &str = "chainguard:push";

pub struct RedisRelay {
    local: Arc<InMemoryEventBus>,
    conn: redis::aio::ConnectionManager,
    redis_url: String,
}

impl RedisRelay {
    /// Connects to `redis_url` and wraps `local`. Returns an error rather
    /// than panicking so startup can decide whether a broken relay is
    /// fatal or merely logged and skipped (§6 leaves that to the
    /// deployment, so `node-runtime`'s wiring treats it as fatal since
    /// the operator explicitly opted into multi-instance mode).
    pub async fn connect(redis_url: String, local: Arc<InMemoryEventBus>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url.clone())?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { local, conn, redis_url })
    }

    /// Spawns the background task that relays remote publishes into the
    /// local bus. Delivery into `local` goes through `InMemoryEventBus`'s
    /// own `EventPublisher` impl, which never touches Redis, so a remote
    /// event received here is never re-published and instances cannot
    /// ping-pong the same event back and forth.
    pub fn spawn_listener(self: &Arc<Self>) {
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if let Err(e) = relay.run_listener_once().await {
                    error!(error = %e, "redis push relay listener failed, retrying in 5s");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        });
    }

    async fn run_listener_once(&self) -> Result<(), redis::RedisError> {
        let client = redis::Client::open(self.redis_url.clone())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(RELAY_CHANNEL).await?;
        let mut stream = pubsub.on_message();

        use futures::StreamExt;
        while let Some(msg) = stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "malformed redis relay payload, skipping");
                    continue;
                }
            };
            match serde_json::from_str::<PushEvent>(&payload) {
                Ok(event) => {
                    let _ = self.local.publish(event).await;
                }
                Err(e) => warn!(error = %e, "could not deserialize relayed push event, skipping"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisRelay {
    async fn publish(&self, event: PushEvent) -> usize {
        let receivers = self.local.publish(event.clone()).await;

        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not serialize push event for redis relay");
                return receivers;
            }
        };

        let mut conn = self.conn.clone();
        if let Err(e) = conn.publish::<_, _, ()>(RELAY_CHANNEL, payload).await {
            warn!(error = %e, "redis publish failed, event delivered locally only");
        }

        receivers
    }

    fn events_published(&self) -> u64 {
        self.local.events_published()
    }

    fn client_count(&self) -> usize {
        self.local.client_count()
    }
}
