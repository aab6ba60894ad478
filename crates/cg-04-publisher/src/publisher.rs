//! Orchestrates schema registration and the two typed publish paths
//! (§4.5).

use crate::chain::{ChainEvent, ChainPublisher, SchemaId};
use crate::payload::{
    encode, risk_score_fields, security_alert_fields, RiskScorePayload, SecurityAlertPayload,
};
use async_trait::async_trait;
use shared_types::entities::Address;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Object-safe facade over [`Publisher`] so callers outside this crate
/// (the per-contract ingester) can hold `Arc<dyn AlertPublisher>` without
/// naming the concrete `ChainPublisher` implementation.
#[async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish_security_alert(
        &self,
        payload: SecurityAlertPayload,
        publisher_address: &Address,
    ) -> PublishOutcome;

    async fn publish_risk_score(&self, payload: RiskScorePayload) -> PublishOutcome;
}

/// Composite score floor below which a `RiskScore` event is never
/// published (§4.5, §8 testable property 6).
pub const RISK_SCORE_PUBLISH_THRESHOLD: u8 = 30;

#[derive(Debug, Default)]
struct SchemaIds {
    security_alert: Option<SchemaId>,
    risk_score: Option<SchemaId>,
}

/// Outcome of one publish attempt, for callers that want to log/count
/// without treating a skip as an error (§4.5 "Failures are logged but do
/// not block the rest of the pipeline").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// No signing key configured, or schema never registered.
    Skipped,
    /// Below the `RiskScore` threshold; not applicable to `SecurityAlert`.
    BelowThreshold,
    Failed,
}

pub struct Publisher<C: ChainPublisher> {
    chain: Arc<C>,
    schemas: RwLock<SchemaIds>,
}

impl<C: ChainPublisher> Publisher<C> {
    #[must_use]
    pub fn new(chain: Arc<C>) -> Self {
        Self {
            chain,
            schemas: RwLock::new(SchemaIds::default()),
        }
    }

    /// Registers both schemas once, at supervisor construction (§4.3,
    /// §4.5). Failure to register is logged but never fatal: later
    /// publish attempts simply skip when a schema id is unset (§9).
    pub async fn register_schemas(&self) {
        if !self.chain.signing_key_configured() {
            info!("no signing key configured, on-chain publication stays disabled");
            return;
        }

        let security_alert_schema = crate::chain::SchemaDefinition {
            name: "SecurityAlert",
            fields: security_alert_fields(),
        };
        match self.chain.register_schema(&security_alert_schema).await {
            Ok(id) => {
                self.schemas.write().await.security_alert = Some(id);
                info!("SecurityAlert schema registered");
            }
            Err(e) => warn!(error = %e, "SecurityAlert schema registration failed, publish will skip"),
        }

        let risk_score_schema = crate::chain::SchemaDefinition {
            name: "RiskScore",
            fields: risk_score_fields(),
        };
        match self.chain.register_schema(&risk_score_schema).await {
            Ok(id) => {
                self.schemas.write().await.risk_score = Some(id);
                info!("RiskScore schema registered");
            }
            Err(e) => warn!(error = %e, "RiskScore schema registration failed, publish will skip"),
        }
    }

    pub async fn publish_security_alert(
        &self,
        payload: SecurityAlertPayload,
        publisher_address: &Address,
    ) -> PublishOutcome {
        if !self.chain.signing_key_configured() {
            return PublishOutcome::Skipped;
        }
        let Some(schema_id) = self.schemas.read().await.security_alert else {
            return PublishOutcome::Skipped;
        };

        let topics = vec![
            pad_topic(payload.contract_address.as_str()),
            pad_topic(publisher_address.as_str()),
        ];
        let event = ChainEvent {
            schema_id,
            data_id: random_data_id(),
            topics,
            data: encode(&payload),
        };

        match self.chain.submit_event(event).await {
            Ok(()) => PublishOutcome::Published,
            Err(e) => {
                warn!(error = %e, "SecurityAlert publish failed, continuing pipeline");
                PublishOutcome::Failed
            }
        }
    }

    pub async fn publish_risk_score(&self, payload: RiskScorePayload) -> PublishOutcome {
        if payload.risk_score < RISK_SCORE_PUBLISH_THRESHOLD {
            return PublishOutcome::BelowThreshold;
        }
        if !self.chain.signing_key_configured() {
            return PublishOutcome::Skipped;
        }
        let Some(schema_id) = self.schemas.read().await.risk_score else {
            return PublishOutcome::Skipped;
        };

        let topics = vec![
            pad_topic(payload.contract_address.as_str()),
            pad_topic(payload.sender.as_str()),
        ];
        let event = ChainEvent {
            schema_id,
            data_id: random_data_id(),
            topics,
            data: encode(&payload),
        };

        match self.chain.submit_event(event).await {
            Ok(()) => PublishOutcome::Published,
            Err(e) => {
                warn!(error = %e, "RiskScore publish failed, continuing pipeline");
                PublishOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl<C: ChainPublisher> AlertPublisher for Publisher<C> {
    async fn publish_security_alert(
        &self,
        payload: SecurityAlertPayload,
        publisher_address: &Address,
    ) -> PublishOutcome {
        Publisher::publish_security_alert(self, payload, publisher_address).await
    }

    async fn publish_risk_score(&self, payload: RiskScorePayload) -> PublishOutcome {
        Publisher::publish_risk_score(self, payload).await
    }
}

fn random_data_id() -> [u8; 32] {
    rand::random()
}

/// Left-pads a hex address string to a 32-byte topic word (§4.5 "indexed
/// topics ... padded to 32 bytes").
fn pad_topic(address_hex: &str) -> [u8; 32] {
    let stripped = address_hex.strip_prefix("0x").unwrap_or(address_hex);
    let bytes = hex::decode(stripped).unwrap_or_default();
    let mut topic = [0u8; 32];
    let start = 32usize.saturating_sub(bytes.len());
    topic[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(32)..]);
    topic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PublishError, SchemaDefinition};
    use async_trait::async_trait;
    use shared_types::entities::{BigUint, Severity, TxHash};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeChain {
        signing_key: AtomicBool,
        register_calls: AtomicUsize,
        submitted: Mutex<Vec<ChainEvent>>,
    }

    #[async_trait]
    impl ChainPublisher for FakeChain {
        async fn register_schema(&self, _schema: &SchemaDefinition) -> Result<SchemaId, PublishError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SchemaId([1u8; 32]))
        }
        async fn submit_event(&self, event: ChainEvent) -> Result<(), PublishError> {
            self.submitted.lock().unwrap().push(event);
            Ok(())
        }
        fn signing_key_configured(&self) -> bool {
            self.signing_key.load(Ordering::SeqCst)
        }
    }

    fn sample_alert() -> SecurityAlertPayload {
        SecurityAlertPayload {
            timestamp: 0,
            contract_address: Address::from("0xc0ffee"),
            tx_hash: TxHash::from("0xdead"),
            alert_type: "SPAM_ATTACK".into(),
            severity: Severity::High,
            description: "spam".into(),
            value: BigUint::zero(),
            gas_used: 1_200_000,
            confidence: 0.8,
        }
    }

    #[tokio::test]
    async fn publish_skipped_without_signing_key() {
        let chain = Arc::new(FakeChain::default());
        let publisher = Publisher::new(chain.clone());
        publisher.register_schemas().await;
        let outcome = publisher
            .publish_security_alert(sample_alert(), &Address::from("0xpub"))
            .await;
        assert_eq!(outcome, PublishOutcome::Skipped);
        assert_eq!(chain.register_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn publish_succeeds_with_signing_key_and_registered_schema() {
        let chain = Arc::new(FakeChain::default());
        chain.signing_key.store(true, Ordering::SeqCst);
        let publisher = Publisher::new(chain.clone());
        publisher.register_schemas().await;

        let outcome = publisher
            .publish_security_alert(sample_alert(), &Address::from("0xpub"))
            .await;
        assert_eq!(outcome, PublishOutcome::Published);
        assert_eq!(chain.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn risk_score_below_threshold_is_not_published() {
        let chain = Arc::new(FakeChain::default());
        chain.signing_key.store(true, Ordering::SeqCst);
        let publisher = Publisher::new(chain.clone());
        publisher.register_schemas().await;

        let payload = RiskScorePayload {
            timestamp: 0,
            contract_address: Address::from("0xc"),
            sender: Address::from("0xs"),
            tx_hash: TxHash::from("0xdead"),
            risk_score: 25,
            risk_level: "LOW".into(),
            primary_factor: "none".into(),
            value: BigUint::zero(),
            gas_used: 21_000,
        };
        let outcome = publisher.publish_risk_score(payload).await;
        assert_eq!(outcome, PublishOutcome::BelowThreshold);
        assert!(chain.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn risk_score_at_threshold_publishes() {
        let chain = Arc::new(FakeChain::default());
        chain.signing_key.store(true, Ordering::SeqCst);
        let publisher = Publisher::new(chain.clone());
        publisher.register_schemas().await;

        let payload = RiskScorePayload {
            timestamp: 0,
            contract_address: Address::from("0xc"),
            sender: Address::from("0xs"),
            tx_hash: TxHash::from("0xdead"),
            risk_score: 30,
            risk_level: "MEDIUM".into(),
            primary_factor: "High value transfer".into(),
            value: BigUint::zero(),
            gas_used: 21_000,
        };
        let outcome = publisher.publish_risk_score(payload).await;
        assert_eq!(outcome, PublishOutcome::Published);
    }
}
