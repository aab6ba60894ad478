//! Shared in-memory fakes for the cross-crate flow tests in
//! [`crate::flows`], grounded on the same `FakeStore`/`NoopPublisher`
//! shapes each crate already tests against in isolation.

use async_trait::async_trait;
use cg_04_publisher::{AlertPublisher, PublishOutcome, RiskScorePayload, SecurityAlertPayload};
use cg_05_ingester::{
    ChainBlock, ChainError, ChainEventSource, ChainReceipt, HistoryError, HistorySource, HistoryTx,
};
use futures::stream::BoxStream;
use shared_types::entities::{
    Address, Alert, BigUint, Contract, ContractStatus, FailedMonitor, Finding, FunctionGasProfile, Transaction,
    TxHash,
};
use shared_types::errors::StoreError;
use shared_types::store::{BaselineUpdate, RecordOutcome, Store};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeStore {
    pub contracts: Mutex<HashMap<Address, Contract>>,
    pub transactions: Mutex<Vec<Transaction>>,
    pub findings: Mutex<Vec<Finding>>,
    pub alerts: Mutex<Vec<Alert>>,
    pub validated: Mutex<Vec<String>>,
    pub failed_monitors: Mutex<Vec<FailedMonitor>>,
}

impl FakeStore {
    pub fn with_contract(self, contract: Contract) -> Self {
        self.contracts.lock().unwrap().insert(contract.address.clone(), contract);
        self
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn record_transaction(&self, tx: &Transaction) -> Result<RecordOutcome, StoreError> {
        let mut txs = self.transactions.lock().unwrap();
        if txs.iter().any(|t| t.hash == tx.hash) {
            return Ok(RecordOutcome::Duplicate);
        }
        txs.push(tx.clone());
        drop(txs);

        let mut contracts = self.contracts.lock().unwrap();
        if let Some(c) = contracts.get_mut(&tx.contract_address) {
            c.total_txs += 1;
            if matches!(tx.status, shared_types::entities::TxStatus::Failed) {
                c.failed_txs += 1;
            }
            c.last_processed_block = tx.block_number.clone();
            c.last_activity = Some(tx.timestamp);
        }
        Ok(RecordOutcome::Inserted)
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

    async fn insert_finding(&self, finding: &Finding) -> Result<(), StoreError> {
        self.findings.lock().unwrap().push(finding.clone());
        Ok(())
    }

    async fn mark_finding_validated(&self, finding_id: &str) -> Result<(), StoreError> {
        self.validated.lock().unwrap().push(finding_id.to_string());
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.lock().unwrap();
        if let Some(existing) = alerts.iter_mut().find(|a| a.id == alert.id) {
            *existing = alert.clone();
        }
        Ok(())
    }

    async fn delete_alert(&self, alert_id: &str) -> Result<(), StoreError> {
        self.alerts.lock().unwrap().retain(|a| a.id != alert_id);
        Ok(())
    }

    async fn insert_failed_monitor(&self, failed: &FailedMonitor) -> Result<(), StoreError> {
        self.failed_monitors.lock().unwrap().push(failed.clone());
        Ok(())
    }

    async fn recent_successful_transactions(
        &self,
        address: &Address,
        since: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                &t.contract_address == address
                    && t.timestamp >= since
                    && matches!(t.status, shared_types::entities::TxStatus::Success)
            })
            .cloned()
            .collect())
    }

    async fn update_baseline(&self, address: &Address, update: BaselineUpdate) -> Result<(), StoreError> {
        if let Some(c) = self.contracts.lock().unwrap().get_mut(address) {
            c.baseline_gas = update.avg_gas;
            c.baseline_gas_std_dev = update.gas_std_dev;
            c.baseline_value = update.avg_value;
            c.baseline_value_std_dev = update.value_std_dev;
            c.baseline_tx_frequency = update.tx_frequency;
            c.baseline_last_updated = Some(update.updated_at);
        }
        Ok(())
    }

    async fn upsert_function_gas_profile(&self, _profile: &FunctionGasProfile) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Records every publish call instead of discarding it, so flow tests can
/// assert on exactly what reached the chain-publisher seam.
#[derive(Default)]
pub struct RecordingPublisher {
    pub alerts: Mutex<Vec<SecurityAlertPayload>>,
    pub risk_scores: Mutex<Vec<RiskScorePayload>>,
}

#[async_trait]
impl AlertPublisher for RecordingPublisher {
    async fn publish_security_alert(
        &self,
        payload: SecurityAlertPayload,
        _publisher_address: &Address,
    ) -> PublishOutcome {
        self.alerts.lock().unwrap().push(payload);
        PublishOutcome::Published
    }

    async fn publish_risk_score(&self, payload: RiskScorePayload) -> PublishOutcome {
        if payload.risk_score < cg_04_publisher::RISK_SCORE_PUBLISH_THRESHOLD {
            return PublishOutcome::BelowThreshold;
        }
        self.risk_scores.lock().unwrap().push(payload);
        PublishOutcome::Published
    }
}

/// A block watcher that never succeeds, for driving a supervisor'd
/// ingester straight through bring-up exhaustion.
pub struct AlwaysFailsWatcher;

#[async_trait]
impl ChainEventSource for AlwaysFailsWatcher {
    async fn watch_blocks(&self) -> Result<BoxStream<'static, Result<BigUint, ChainError>>, ChainError> {
        Err(ChainError::Subscription("no upstream configured".into()))
    }
    async fn get_block_with_transactions(&self, _number: &BigUint) -> Result<ChainBlock, ChainError> {
        unimplemented!("never reached: watch_blocks always fails before this would be called")
    }
    async fn get_transaction_receipt(&self, _hash: &TxHash) -> Result<Option<ChainReceipt>, ChainError> {
        unimplemented!("never reached: watch_blocks always fails before this would be called")
    }
}

/// A watcher that subscribes successfully but never emits a block,
/// for start/stop lifecycle tests that should not reach bring-up retry.
pub struct IdleWatcher;

#[async_trait]
impl ChainEventSource for IdleWatcher {
    async fn watch_blocks(&self) -> Result<BoxStream<'static, Result<BigUint, ChainError>>, ChainError> {
        Ok(Box::pin(futures::stream::pending()))
    }
    async fn get_block_with_transactions(&self, _number: &BigUint) -> Result<ChainBlock, ChainError> {
        unimplemented!("no blocks are ever produced by this watcher")
    }
    async fn get_transaction_receipt(&self, _hash: &TxHash) -> Result<Option<ChainReceipt>, ChainError> {
        unimplemented!("no blocks are ever produced by this watcher")
    }
}

pub struct EmptyHistory;

#[async_trait]
impl HistorySource for EmptyHistory {
    async fn list_transactions(
        &self,
        _address: &Address,
        _start_block: &BigUint,
    ) -> Result<Vec<HistoryTx>, HistoryError> {
        Ok(vec![])
    }
}
