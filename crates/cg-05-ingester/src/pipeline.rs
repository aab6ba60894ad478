//! Shared per-transaction processing pipeline (§4.2, §5): the exact
//! persist -> score -> enqueue -> publish -> push order used by the
//! block-watcher path, the polling-fallback path, and backfill replay.

use cg_01_risk_engine::{evaluate, FrequencyTracker, TxView};
use cg_03_validation_queue::ValidationQueue;
use cg_04_publisher::{AlertPublisher, RiskScorePayload, SecurityAlertPayload};
use shared_bus::{EventPublisher, PushEvent};
use shared_types::entities::{Address, Finding, Network, Transaction};
use shared_types::errors::StoreError;
use shared_types::store::{RecordOutcome, Store};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Wires together the four downstream systems a freshly observed
/// transaction must pass through, so the watcher path, the polling
/// fallback path and the backfill replay task all run the identical
/// sequence (§5 "every transaction ... goes through the same steps
/// regardless of how it was observed").
pub struct Pipeline {
    store: Arc<dyn Store>,
    queue: Arc<Mutex<ValidationQueue>>,
    publisher: Arc<dyn AlertPublisher>,
    bus: Arc<dyn EventPublisher>,
    publisher_address: Address,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<Mutex<ValidationQueue>>,
        publisher: Arc<dyn AlertPublisher>,
        bus: Arc<dyn EventPublisher>,
        publisher_address: Address,
    ) -> Self {
        Self {
            store,
            queue,
            publisher,
            bus,
            publisher_address,
        }
    }

    /// Runs one transaction through persist -> risk-engine -> persist
    /// findings -> enqueue validation -> publish -> push, in that order
    /// (§4.2, §4.5). Returns `Ok(false)` without further processing if
    /// the transaction's hash was already recorded (invariant 2).
    pub async fn process(
        &self,
        tx: Transaction,
        network: Network,
        freq: &mut FrequencyTracker,
        now: i64,
    ) -> Result<bool, StoreError> {
        let outcome = self.store.record_transaction(&tx).await?;
        if outcome == RecordOutcome::Duplicate {
            return Ok(false);
        }

        self.bus
            .publish(PushEvent::Transaction {
                contract_address: tx.contract_address.clone(),
                transaction: tx.clone(),
            })
            .await;

        let view = TxView {
            hash: tx.hash.clone(),
            from: tx.from.clone(),
            to: tx.to.clone(),
            value: tx.value.clone(),
            gas_used: tx.gas_used,
            status: tx.status,
            network,
        };
        let assessment = evaluate(&view, freq, now);

        let mut findings = Vec::with_capacity(assessment.findings.len());
        for hf in assessment.findings {
            let finding = Finding {
                id: Uuid::new_v4().to_string(),
                contract_address: tx.contract_address.clone(),
                r#type: hf.r#type.to_string(),
                severity: hf.severity,
                rule_confidence: hf.rule_confidence,
                function_name: hf.function_name,
                line: None,
                code_snippet: None,
                description: hf.description,
                validated: false,
                created_at: now,
            };

            if let Err(e) = self.store.insert_finding(&finding).await {
                warn!(error = %e, tx = %tx.hash, "failed to persist finding");
            }

            self.queue.lock().await.enqueue(finding.clone(), now);

            let alert_payload = SecurityAlertPayload {
                timestamp: now,
                contract_address: finding.contract_address.clone(),
                tx_hash: tx.hash.clone(),
                alert_type: finding.r#type.clone(),
                severity: finding.severity,
                description: finding.description.clone(),
                value: tx.value.clone(),
                gas_used: tx.gas_used,
                confidence: finding.rule_confidence,
            };
            self.publisher
                .publish_security_alert(alert_payload, &self.publisher_address)
                .await;

            self.bus
                .publish(PushEvent::NewFinding {
                    contract_address: finding.contract_address.clone(),
                    finding: finding.clone(),
                })
                .await;

            findings.push(finding);
        }

        if !findings.is_empty() {
            self.bus
                .publish(PushEvent::NewFindings {
                    contract_address: tx.contract_address.clone(),
                    findings,
                })
                .await;
        }

        let risk_payload = RiskScorePayload {
            timestamp: now,
            contract_address: tx.contract_address.clone(),
            sender: tx.from.clone(),
            tx_hash: tx.hash.clone(),
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level.to_string(),
            primary_factor: assessment.primary_factor,
            value: tx.value,
            gas_used: tx.gas_used,
        };
        self.publisher.publish_risk_score(risk_payload).await;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cg_04_publisher::PublishOutcome;
    use shared_types::entities::{BigUint, Contract, ContractStatus, Network, Severity, TxHash, TxStatus};
    use shared_types::store::BaselineUpdate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeStore {
        recorded: StdMutex<Vec<TxHash>>,
        findings: StdMutex<Vec<Finding>>,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn record_transaction(&self, tx: &Transaction) -> Result<RecordOutcome, StoreError> {
            let mut recorded = self.recorded.lock().unwrap();
            if recorded.contains(&tx.hash) {
                return Ok(RecordOutcome::Duplicate);
            }
            recorded.push(tx.hash.clone());
            Ok(RecordOutcome::Inserted)
        }
        async fn get_contract(&self, _address: &Address) -> Result<Option<Contract>, StoreError> {
            Ok(None)
        }
        async fn list_monitored_contracts(&self) -> Result<Vec<Contract>, StoreError> {
            Ok(vec![])
        }
        async fn update_contract_status(
            &self,
            _address: &Address,
            _status: ContractStatus,
            _message: Option<String>,
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn insert_finding(&self, finding: &Finding) -> Result<(), StoreError> {
            self.findings.lock().unwrap().push(finding.clone());
            Ok(())
        }
        async fn mark_finding_validated(&self, _finding_id: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn insert_alert(&self, _alert: &shared_types::entities::Alert) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update_alert(&self, _alert: &shared_types::entities::Alert) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete_alert(&self, _alert_id: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn insert_failed_monitor(
            &self,
            _failed: &shared_types::entities::FailedMonitor,
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn recent_successful_transactions(
            &self,
            _address: &Address,
            _since: i64,
        ) -> Result<Vec<Transaction>, StoreError> {
            Ok(vec![])
        }
        async fn update_baseline(&self, _address: &Address, _update: BaselineUpdate) -> Result<(), StoreError> {
            Ok(())
        }
        async fn upsert_function_gas_profile(
            &self,
            _profile: &shared_types::entities::FunctionGasProfile,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePublisher {
        alerts: AtomicUsize,
        risk_scores: AtomicUsize,
    }

    #[async_trait]
    impl AlertPublisher for FakePublisher {
        async fn publish_security_alert(
            &self,
            _payload: SecurityAlertPayload,
            _publisher_address: &Address,
        ) -> PublishOutcome {
            self.alerts.fetch_add(1, Ordering::SeqCst);
            PublishOutcome::Published
        }
        async fn publish_risk_score(&self, _payload: RiskScorePayload) -> PublishOutcome {
            self.risk_scores.fetch_add(1, Ordering::SeqCst);
            PublishOutcome::Published
        }
    }

    fn sample_tx(hash: &str, value_wei: u128, gas_used: u64) -> Transaction {
        Transaction {
            id: "t1".into(),
            hash: TxHash::from(hash),
            from: Address::from("0xsender"),
            to: Some(Address::from("0xcontract")),
            value: BigUint::from_u128(value_wei),
            gas_used,
            status: TxStatus::Success,
            block_number: BigUint::zero(),
            timestamp: 0,
            contract_address: Address::from("0xcontract"),
        }
    }

    fn pipeline() -> (Pipeline, Arc<FakeStore>, Arc<FakePublisher>, Arc<shared_bus::InMemoryEventBus>) {
        let store = Arc::new(FakeStore::default());
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        let publisher = Arc::new(FakePublisher::default());
        let bus = Arc::new(shared_bus::InMemoryEventBus::new());
        let pipeline = Pipeline::new(
            store.clone(),
            queue,
            publisher.clone(),
            bus.clone(),
            Address::from("0xservice"),
        );
        (pipeline, store, publisher, bus)
    }

    #[tokio::test]
    async fn duplicate_transaction_short_circuits() {
        let (pipeline, store, publisher, _bus) = pipeline();
        let mut freq = FrequencyTracker::new();

        let first = pipeline
            .process(sample_tx("0xaaa", 0, 21_000), Network::Testnet, &mut freq, 0)
            .await
            .unwrap();
        let second = pipeline
            .process(sample_tx("0xaaa", 0, 21_000), Network::Testnet, &mut freq, 1)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.recorded.lock().unwrap().len(), 1);
        assert_eq!(publisher.risk_scores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn high_value_transfer_produces_finding_and_publishes_alert() {
        let (pipeline, store, publisher, _bus) = pipeline();
        let mut freq = FrequencyTracker::new();

        let processed = pipeline
            .process(
                sample_tx("0xbbb", 11_000_000_000_000_000_000, 100_000),
                Network::Testnet,
                &mut freq,
                0,
            )
            .await
            .unwrap();

        assert!(processed);
        assert_eq!(store.findings.lock().unwrap().len(), 1);
        assert_eq!(publisher.alerts.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.risk_scores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn quiet_transaction_produces_no_findings() {
        let (pipeline, store, publisher, _bus) = pipeline();
        let mut freq = FrequencyTracker::new();

        pipeline
            .process(sample_tx("0xccc", 0, 21_000), Network::Testnet, &mut freq, 0)
            .await
            .unwrap();

        assert!(store.findings.lock().unwrap().is_empty());
        assert_eq!(publisher.alerts.load(Ordering::SeqCst), 0);
    }
}
