//! The monitor supervisor (C6, §4.3): starts and stops per-contract
//! ingesters, reports aggregate health, and holds the single global
//! pause switch over the validation queue.

use crate::control::ControlBlock;
use async_trait::async_trait;
use cg_03_validation_queue::{QueueStats, ValidationQueue};
use cg_04_publisher::AlertPublisher;
use cg_05_ingester::{ChainEventSource, HistorySource, Ingester, IngesterFailureHandler, Pipeline};
use shared_bus::{EventPublisher, PushEvent};
use shared_types::entities::{Address, Alert, ContractStatus, Network, Severity};
use shared_types::errors::StoreError;
use shared_types::store::Store;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("contract {0} is already monitored")]
    AlreadyMonitored(String),
    #[error("contract {0} is not monitored")]
    NotMonitored(String),
    #[error("contract {0} has no registered record in the store")]
    ContractNotRegistered(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One row of [`SupervisorHealth::contracts`].
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub address: Address,
    pub network: Network,
    pub status: ContractStatus,
    pub running: bool,
}

/// Aggregate health snapshot (§4.3 `health()`, §6 `/api/monitor/health`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupervisorHealth {
    pub monitored: usize,
    pub running: usize,
    pub failed: usize,
    pub contracts: Vec<MonitorStatus>,
}

/// Push-channel delivery counters (§4.3 `eventStats()`, §6
/// `/api/monitor/events`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStats {
    pub events_published: u64,
    /// Clients currently subscribed to the push channel (§6 `/metrics`
    /// `clientsCount`).
    pub clients_connected: usize,
}

/// Raises the `MONITORING_FAILURE` operational alert and pushes it once
/// an ingester's bring-up retry budget is exhausted (§4.2 "Supervisor",
/// §7). The `FailedMonitor` row itself is already written by the
/// ingester; this only adds the user-facing alert.
struct FailureHandler {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventPublisher>,
}

#[async_trait]
impl IngesterFailureHandler for FailureHandler {
    async fn on_bring_up_exhausted(&self, address: &Address, _network: Network, reason: String, now: i64) {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            contract_address: address.clone(),
            r#type: "MONITORING_FAILURE".into(),
            severity: Severity::Critical,
            description: reason,
            recommendation: Some(
                "Investigate chain connectivity for this contract and restart monitoring once resolved.".into(),
            ),
            dismissed: false,
            llm_valid: None,
            llm_confidence: None,
            llm_reason: None,
            llm_context: None,
            created_at: now,
        };
        if let Err(e) = self.store.insert_alert(&alert).await {
            warn!(error = %e, "failed to persist MONITORING_FAILURE alert");
        }
        self.bus
            .publish(PushEvent::MonitoringFailure {
                contract_address: address.clone(),
                alert,
            })
            .await;
    }
}

/// Owns the lifecycle of every per-contract ingester (§4.3): starting,
/// stopping, health reporting, and the global pause switch over the
/// validation queue exposed at `POST /api/monitor/pause` (§6).
///
/// Schema registration against the chain publisher (§4.3 "happens once
/// at construction") is the caller's responsibility: it happens once,
/// before a concrete `Publisher<C>` is wrapped as the `Arc<dyn
/// AlertPublisher>` passed in here, since this struct only needs the
/// narrower publish surface.
pub struct Supervisor<C, H, F>
where
    C: ChainEventSource + 'static,
    H: HistorySource + 'static,
    F: Fn(&Address, Network) -> (Arc<C>, Arc<H>) + Send + Sync + 'static,
{
    store: Arc<dyn Store>,
    bus: Arc<dyn EventPublisher>,
    publisher: Arc<dyn AlertPublisher>,
    queue: Arc<Mutex<ValidationQueue>>,
    publisher_address: Address,
    source_factory: F,
    controls: RwLock<HashMap<Address, ControlBlock<C, H>>>,
}

impl<C, H, F> Supervisor<C, H, F>
where
    C: ChainEventSource + 'static,
    H: HistorySource + 'static,
    F: Fn(&Address, Network) -> (Arc<C>, Arc<H>) + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventPublisher>,
        publisher: Arc<dyn AlertPublisher>,
        queue: Arc<Mutex<ValidationQueue>>,
        publisher_address: Address,
        source_factory: F,
    ) -> Self {
        Self {
            store,
            bus,
            publisher,
            queue,
            publisher_address,
            source_factory,
            controls: RwLock::new(HashMap::new()),
        }
    }

    /// Starts monitoring `address` on `network`: builds a fresh chain
    /// source pair via the factory, wires a [`Pipeline`], and spawns the
    /// ingester's background task (§4.3 `start(address, network)`).
    /// `address` must already have a row in the store; contract creation
    /// itself is out of this crate's scope (§1 non-goals, the external
    /// REST surface).
    pub async fn start(
        &self,
        address: Address,
        network: Network,
        now: impl Fn() -> i64 + Send + Clone + 'static,
    ) -> Result<(), SupervisorError> {
        if self.controls.read().await.contains_key(&address) {
            return Err(SupervisorError::AlreadyMonitored(address.as_str().to_string()));
        }
        if self.store.get_contract(&address).await?.is_none() {
            return Err(SupervisorError::ContractNotRegistered(address.as_str().to_string()));
        }

        let (chain, history) = (self.source_factory)(&address, network);
        let pipeline = Arc::new(Pipeline::new(
            self.store.clone(),
            self.queue.clone(),
            self.publisher.clone(),
            self.bus.clone(),
            self.publisher_address.clone(),
        ));
        let failure_handler = Arc::new(FailureHandler {
            store: self.store.clone(),
            bus: self.bus.clone(),
        });

        let ingester = Ingester::new(
            address.clone(),
            network,
            chain,
            history,
            self.store.clone(),
            pipeline,
            self.bus.clone(),
            failure_handler,
        );

        let handle = tokio::spawn(ingester.clone().run(now));

        self.controls.write().await.insert(
            address.clone(),
            ControlBlock {
                ingester,
                handle,
                network,
            },
        );
        info!(contract = %address, %network, "monitoring started");
        Ok(())
    }

    /// Cancels and forgets the ingester for `address` (§4.3
    /// `stop(address)`); a subsequent `start` for the same address
    /// converges to the same running state (§8 `start∘stop∘start`).
    pub async fn stop(&self, address: &Address) -> Result<(), SupervisorError> {
        let control = self
            .controls
            .write()
            .await
            .remove(address)
            .ok_or_else(|| SupervisorError::NotMonitored(address.as_str().to_string()))?;

        control.ingester.stop();
        control.handle.abort();
        self.store
            .update_contract_status(address, ContractStatus::Stopped, None)
            .await?;
        info!(contract = %address, "monitoring stopped");
        Ok(())
    }

    /// Global validation-queue pause switch (§4.3 `pause(bool)`, §6
    /// `POST /api/monitor/pause`). Ingestion keeps running while paused;
    /// only the LLM validation worker stops popping new items.
    pub async fn pause(&self, paused: bool) {
        let mut q = self.queue.lock().await;
        if paused {
            q.pause();
        } else {
            q.resume();
        }
    }

    /// Aggregate health across every monitored contract (§4.3
    /// `health()`). A control block whose task has already exited
    /// (bring-up exhausted, §4.2) counts as failed rather than running.
    pub async fn health(&self) -> SupervisorHealth {
        let controls = self.controls.read().await;
        let mut health = SupervisorHealth {
            monitored: controls.len(),
            ..Default::default()
        };

        for (address, control) in controls.iter() {
            let running = !control.handle.is_finished();
            if running {
                health.running += 1;
            } else {
                health.failed += 1;
            }
            let status = match self.store.get_contract(address).await {
                Ok(Some(c)) => c.status,
                _ => ContractStatus::Error,
            };
            health.contracts.push(MonitorStatus {
                address: address.clone(),
                network: control.network,
                status,
                running,
            });
        }

        health
    }

    /// Push-channel delivery counters (§4.3 `eventStats()`).
    #[must_use]
    pub fn event_stats(&self) -> EventStats {
        EventStats {
            events_published: self.bus.events_published(),
            clients_connected: self.bus.client_count(),
        }
    }

    /// Queue/rate/budget snapshot, forwarded for the operational
    /// `/api/monitor/status` route.
    pub async fn queue_stats(&self, now: i64) -> QueueStats {
        self.queue.lock().await.stats(now)
    }

    #[must_use]
    pub async fn is_monitored(&self, address: &Address) -> bool {
        self.controls.read().await.contains_key(address)
    }
}

/// Narrow port the operational HTTP surface (§6) programs against,
/// so it can hold a `Supervisor<C, H, F>` behind a trait object without
/// carrying its chain-adapter type parameters.
#[async_trait]
pub trait MonitorControl: Send + Sync {
    async fn health(&self) -> SupervisorHealth;
    fn event_stats(&self) -> EventStats;
    async fn queue_stats(&self, now: i64) -> QueueStats;
    async fn pause(&self, paused: bool);
}

#[async_trait]
impl<C, H, F> MonitorControl for Supervisor<C, H, F>
where
    C: ChainEventSource + 'static,
    H: HistorySource + 'static,
    F: Fn(&Address, Network) -> (Arc<C>, Arc<H>) + Send + Sync + 'static,
{
    async fn health(&self) -> SupervisorHealth {
        Supervisor::health(self).await
    }
    fn event_stats(&self) -> EventStats {
        Supervisor::event_stats(self)
    }
    async fn queue_stats(&self, now: i64) -> QueueStats {
        Supervisor::queue_stats(self, now).await
    }
    async fn pause(&self, paused: bool) {
        Supervisor::pause(self, paused).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_04_publisher::{PublishOutcome, RiskScorePayload, SecurityAlertPayload};
    use cg_05_ingester::{
        ChainBlock, ChainError, ChainReceipt, ChainTx, HistoryError, HistoryTx,
    };
    use futures::stream::BoxStream;
    use shared_types::entities::{BigUint, Contract, FailedMonitor, Finding, FunctionGasProfile, Transaction, TxHash};
    use shared_types::store::{BaselineUpdate, RecordOutcome};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeStore {
        contracts: StdMutex<HashMap<Address, Contract>>,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn record_transaction(&self, _tx: &Transaction) -> Result<RecordOutcome, StoreError> {
            unimplemented!()
        }
        async fn get_contract(&self, address: &Address) -> Result<Option<Contract>, StoreError> {
            Ok(self.contracts.lock().unwrap().get(address).cloned())
        }
        async fn list_monitored_contracts(&self) -> Result<Vec<Contract>, StoreError> {
            Ok(self.contracts.lock().unwrap().values().cloned().collect())
        }
        async fn update_contract_status(
            &self,
            address: &Address,
            status: ContractStatus,
            message: Option<String>,
        ) -> Result<(), StoreError> {
            if let Some(c) = self.contracts.lock().unwrap().get_mut(address) {
                c.status = status;
                c.status_message = message;
            }
            Ok(())
        }
        async fn insert_finding(&self, _finding: &Finding) -> Result<(), StoreError> {
            Ok(())
        }
        async fn mark_finding_validated(&self, _finding_id: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn insert_alert(&self, _alert: &Alert) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update_alert(&self, _alert: &Alert) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete_alert(&self, _alert_id: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn insert_failed_monitor(&self, _failed: &FailedMonitor) -> Result<(), StoreError> {
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
        async fn upsert_function_gas_profile(&self, _profile: &FunctionGasProfile) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct NoopPublisher;
    #[async_trait]
    impl AlertPublisher for NoopPublisher {
        async fn publish_security_alert(
            &self,
            _payload: SecurityAlertPayload,
            _publisher_address: &Address,
        ) -> PublishOutcome {
            PublishOutcome::Skipped
        }
        async fn publish_risk_score(&self, _payload: RiskScorePayload) -> PublishOutcome {
            PublishOutcome::Skipped
        }
    }

    struct StubChain;
    #[async_trait]
    impl ChainEventSource for StubChain {
        async fn watch_blocks(&self) -> Result<BoxStream<'static, Result<BigUint, ChainError>>, ChainError> {
            Ok(Box::pin(futures::stream::pending()))
        }
        async fn get_block_with_transactions(&self, _number: &BigUint) -> Result<ChainBlock, ChainError> {
            unimplemented!()
        }
        async fn get_transaction_receipt(&self, _hash: &TxHash) -> Result<Option<ChainReceipt>, ChainError> {
            unimplemented!()
        }
    }

    struct StubHistory;
    #[async_trait]
    impl HistorySource for StubHistory {
        async fn list_transactions(
            &self,
            _address: &Address,
            _start_block: &BigUint,
        ) -> Result<Vec<HistoryTx>, HistoryError> {
            Ok(vec![])
        }
    }

    fn supervisor() -> Supervisor<StubChain, StubHistory, impl Fn(&Address, Network) -> (Arc<StubChain>, Arc<StubHistory>)> {
        let store = Arc::new(FakeStore::default());
        let bus = Arc::new(shared_bus::InMemoryEventBus::new());
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        Supervisor::new(
            store,
            bus,
            Arc::new(NoopPublisher),
            queue,
            Address::from("0xservice"),
            |_address, _network| (Arc::new(StubChain), Arc::new(StubHistory)),
        )
    }

    #[tokio::test]
    async fn start_rejects_unregistered_contract() {
        let sup = supervisor();
        let result = sup.start(Address::from("0xnew"), Network::Testnet, || 0).await;
        assert!(matches!(result, Err(SupervisorError::ContractNotRegistered(_))));
    }

    #[tokio::test]
    async fn start_stop_start_converges() {
        let store = Arc::new(FakeStore::default());
        store.contracts.lock().unwrap().insert(
            Address::from("0xc"),
            Contract::new("c1".into(), Address::from("0xc"), Network::Testnet, 0),
        );
        let bus = Arc::new(shared_bus::InMemoryEventBus::new());
        let queue = Arc::new(Mutex::new(ValidationQueue::new(0)));
        let sup = Supervisor::new(
            store,
            bus,
            Arc::new(NoopPublisher),
            queue,
            Address::from("0xservice"),
            |_address, _network| (Arc::new(StubChain), Arc::new(StubHistory)),
        );

        sup.start(Address::from("0xc"), Network::Testnet, || 0).await.unwrap();
        assert!(sup.is_monitored(&Address::from("0xc")).await);

        let duplicate = sup.start(Address::from("0xc"), Network::Testnet, || 0).await;
        assert!(matches!(duplicate, Err(SupervisorError::AlreadyMonitored(_))));

        sup.stop(&Address::from("0xc")).await.unwrap();
        assert!(!sup.is_monitored(&Address::from("0xc")).await);

        sup.start(Address::from("0xc"), Network::Testnet, || 0).await.unwrap();
        assert!(sup.is_monitored(&Address::from("0xc")).await);
    }

    #[tokio::test]
    async fn pause_and_resume_toggle_queue_stats() {
        let sup = supervisor();
        sup.pause(true).await;
        assert!(sup.queue_stats(0).await.paused);
        sup.pause(false).await;
        assert!(!sup.queue_stats(0).await.paused);
    }

    #[tokio::test]
    async fn health_reports_zero_contracts_when_empty() {
        let sup = supervisor();
        let health = sup.health().await;
        assert_eq!(health.monitored, 0);
        assert_eq!(health.running, 0);
        assert_eq!(health.failed, 0);
    }
}
