//! Cross-crate flow tests: scenarios that need more than one crate wired
//! together to exercise (the dedup/idempotence laws, the publish
//! threshold, the validation queue's full round trip, and a supervised
//! ingester's bring-up failure path).

#[cfg(test)]
mod tests {
    use crate::fakes::{AlwaysFailsWatcher, EmptyHistory, FakeStore, IdleWatcher, RecordingPublisher};
    use cg_01_risk_engine::FrequencyTracker;
    use cg_03_validation_queue::{ValidationEngine, ValidationQueue, ValidatorError, ValidatorOutcome};
    use cg_05_ingester::Pipeline;
    use cg_06_supervisor::Supervisor;
    use shared_bus::{EventPublisher, InMemoryEventBus};
    use shared_types::entities::{Address, BigUint, Contract, Network, Severity, Transaction, TxHash, TxStatus};
    use shared_types::store::Store;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn tx(hash: &str, value_wei: u128, gas_used: u64, status: TxStatus) -> Transaction {
        Transaction {
            id: "t1".into(),
            hash: TxHash::from(hash),
            from: Address::from("0xsender"),
            to: Some(Address::from("0xcontract")),
            value: BigUint::from_u128(value_wei),
            gas_used,
            status,
            block_number: BigUint::zero(),
            timestamp: 0,
            contract_address: Address::from("0xcontract"),
        }
    }

    fn pipeline_harness() -> (Pipeline, Arc<FakeStore>, Arc<RecordingPublisher>, Arc<InMemoryEventBus>) {
        let store = Arc::new(
            FakeStore::default().with_contract(Contract::new(
                "c1".into(),
                Address::from("0xcontract"),
                Network::Testnet,
                0,
            )),
        );
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        let publisher = Arc::new(RecordingPublisher::default());
        let bus = Arc::new(InMemoryEventBus::new());
        let pipeline = Pipeline::new(
            store.clone(),
            queue,
            publisher.clone(),
            bus.clone(),
            Address::from("0xservice"),
        );
        (pipeline, store, publisher, bus)
    }

    /// S1 (high-value transfer): riskScore 40 clears the publish
    /// threshold, so both a SecurityAlert and a RiskScore reach the
    /// chain publisher, and the finding lands in the store.
    #[tokio::test]
    async fn s1_high_value_transfer_publishes_alert_and_risk_score() {
        let (pipeline, store, publisher, _bus) = pipeline_harness();
        let mut freq = FrequencyTracker::new();

        pipeline
            .process(
                tx("0xs1", 11_000_000_000_000_000_000, 100_000, TxStatus::Success),
                Network::Testnet,
                &mut freq,
                0,
            )
            .await
            .unwrap();

        let findings = store.findings.lock().unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].r#type, "SUSPICIOUS_ACTIVITY");
        drop(findings);

        let alerts = publisher.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, "SUSPICIOUS_ACTIVITY");
        drop(alerts);

        let risk_scores = publisher.risk_scores.lock().unwrap();
        assert_eq!(risk_scores.len(), 1);
        assert_eq!(risk_scores[0].risk_score, 40);
    }

    /// S3 (failed high-gas only): riskScore 25 is below the publish
    /// threshold, so the RiskScore event never reaches the publisher even
    /// though the SecurityAlert for the finding does.
    #[tokio::test]
    async fn s3_failed_high_gas_alert_without_risk_score() {
        let (pipeline, store, publisher, _bus) = pipeline_harness();
        let mut freq = FrequencyTracker::new();

        pipeline
            .process(tx("0xs3", 0, 250_000, TxStatus::Failed), Network::Testnet, &mut freq, 0)
            .await
            .unwrap();

        assert_eq!(store.findings.lock().unwrap().len(), 1);
        assert_eq!(publisher.alerts.lock().unwrap().len(), 1);
        assert!(
            publisher.risk_scores.lock().unwrap().is_empty(),
            "riskScore 25 is below the publish threshold of 30"
        );
    }

    /// S6 (duplicate delivery): the same hash delivered twice (as if seen
    /// once by the watcher and once by the polling fallback) is recorded
    /// exactly once, and the second delivery never reaches the risk
    /// engine or the publisher at all.
    #[tokio::test]
    async fn s6_duplicate_delivery_dedups_and_publishes_once() {
        let (pipeline, store, publisher, _bus) = pipeline_harness();
        let mut freq = FrequencyTracker::new();

        let first = pipeline
            .process(
                tx("0xs6", 11_000_000_000_000_000_000, 100_000, TxStatus::Success),
                Network::Testnet,
                &mut freq,
                0,
            )
            .await
            .unwrap();
        let second = pipeline
            .process(
                tx("0xs6", 11_000_000_000_000_000_000, 100_000, TxStatus::Success),
                Network::Testnet,
                &mut freq,
                1,
            )
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.transactions.lock().unwrap().len(), 1);
        assert_eq!(publisher.alerts.lock().unwrap().len(), 1);
        assert_eq!(publisher.risk_scores.lock().unwrap().len(), 1);
    }

    /// A finding the pipeline enqueues is picked up by the validation
    /// queue's own scheduler, validated, and turned into a persisted,
    /// LLM-confirmed alert — the full C5 -> C3 round trip.
    #[tokio::test]
    async fn finding_flows_from_pipeline_through_validation_queue_to_alert() {
        let store = Arc::new(
            FakeStore::default().with_contract(Contract::new(
                "c1".into(),
                Address::from("0xcontract"),
                Network::Testnet,
                0,
            )),
        );
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        let publisher = Arc::new(RecordingPublisher::default());
        let bus = Arc::new(InMemoryEventBus::new());
        let pipeline = Pipeline::new(
            store.clone(),
            queue.clone(),
            publisher,
            bus,
            Address::from("0xservice"),
        );
        let mut freq = FrequencyTracker::new();

        pipeline
            .process(
                tx("0xqueue", 11_000_000_000_000_000_000, 100_000, TxStatus::Success),
                Network::Testnet,
                &mut freq,
                0,
            )
            .await
            .unwrap();

        assert_eq!(queue.lock().await.stats(0).waiting, 1);

        struct AlwaysValid;
        #[async_trait::async_trait]
        impl cg_03_validation_queue::Validator for AlwaysValid {
            async fn validate(
                &self,
                _request: cg_03_validation_queue::ValidationRequest,
            ) -> Result<ValidatorOutcome, ValidatorError> {
                Ok(ValidatorOutcome::Valid {
                    confidence: 0.97,
                    severity: Severity::Critical,
                    reason: Some("confirmed flash loan pattern".into()),
                    recommendation: Some("pause contract immediately".into()),
                    additional_context: None,
                })
            }
        }

        let engine = ValidationEngine::new(queue.clone(), Arc::new(AlwaysValid), store.clone());
        let outcome = engine.tick(1).await;

        assert_eq!(outcome, cg_03_validation_queue::TickOutcome::Processed);
        assert_eq!(queue.lock().await.stats(1).waiting, 0);
        assert_eq!(store.validated.lock().unwrap().len(), 1);
        let alerts = store.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].llm_confidence, Some(0.97));
    }

    /// A supervised ingester whose chain source never connects exhausts
    /// its bring-up budget, gets marked failed in `Supervisor::health()`,
    /// and raises a `MONITORING_FAILURE` alert that reaches both the
    /// store and the push bus.
    #[tokio::test(start_paused = true)]
    async fn supervised_ingester_bring_up_exhaustion_raises_monitoring_failure() {
        let store = Arc::new(
            FakeStore::default().with_contract(Contract::new(
                "c1".into(),
                Address::from("0xcontract"),
                Network::Testnet,
                0,
            )),
        );
        let bus = Arc::new(InMemoryEventBus::new());
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        let publisher = Arc::new(RecordingPublisher::default());

        let supervisor = Supervisor::new(
            store.clone() as Arc<dyn Store>,
            bus.clone() as Arc<dyn EventPublisher>,
            publisher,
            queue,
            Address::from("0xservice"),
            |_address, _network| (Arc::new(AlwaysFailsWatcher), Arc::new(EmptyHistory)),
        );

        supervisor
            .start(Address::from("0xcontract"), Network::Testnet, || 0)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(600)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let health = supervisor.health().await;
        assert_eq!(health.monitored, 1);
        assert_eq!(health.failed, 1);
        assert_eq!(health.running, 0);

        let alerts = store.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].r#type, "MONITORING_FAILURE");
        assert_eq!(alerts[0].severity, Severity::Critical);
        drop(alerts);

        assert_eq!(bus.events_published(), 1);
    }

    /// `start` -> `stop` -> `start` on the same address converges back to
    /// a single running ingester, with no duplicate control block left
    /// behind from the first run.
    #[tokio::test]
    async fn supervisor_start_stop_start_converges_to_running() {
        let store = Arc::new(
            FakeStore::default().with_contract(Contract::new(
                "c1".into(),
                Address::from("0xcontract"),
                Network::Testnet,
                0,
            )),
        );
        let bus = Arc::new(InMemoryEventBus::new());
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        let publisher = Arc::new(RecordingPublisher::default());

        let supervisor = Supervisor::new(
            store as Arc<dyn Store>,
            bus as Arc<dyn EventPublisher>,
            publisher,
            queue,
            Address::from("0xservice"),
            |_address, _network| (Arc::new(IdleWatcher), Arc::new(EmptyHistory)),
        );

        let addr = Address::from("0xcontract");
        supervisor.start(addr.clone(), Network::Testnet, || 0).await.unwrap();
        supervisor.stop(&addr).await.unwrap();
        supervisor.start(addr.clone(), Network::Testnet, || 0).await.unwrap();

        let health = supervisor.health().await;
        assert_eq!(health.monitored, 1);
        assert_eq!(health.running, 1);
    }
}
