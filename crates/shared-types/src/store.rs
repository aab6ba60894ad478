//! # Persistent Store Port
//!
//! The store is the only cross-task shared mutable state (§5). This trait
//! is the single contract every domain crate programs against; the
//! concrete Postgres implementation lives in the separate `cg-store`
//! crate so that `cg-01-risk-engine`, `cg-03-validation-queue`,
//! `cg-05-ingester`, `cg-06-supervisor` and `cg-02-baseline` stay free of
//! a driver dependency and are unit-testable against an in-memory fake.

use crate::entities::{
    Address, Alert, Contract, ContractStatus, FailedMonitor, Finding, FunctionGasProfile,
    Transaction,
};
use crate::errors::StoreError;
use async_trait::async_trait;

/// Outcome of recording a freshly observed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The transaction was new; counters were advanced.
    Inserted,
    /// `hash` already existed; this call was a no-op (invariant 2).
    Duplicate,
}

/// Baseline fields written by the baseline job (§4.6), grouped so a
/// single store call updates all of them plus `baseline_last_updated`
/// atomically.
#[derive(Debug, Clone)]
pub struct BaselineUpdate {
    pub avg_gas: u64,
    pub gas_std_dev: u64,
    pub avg_value: crate::entities::BigUint,
    pub value_std_dev: crate::entities::BigUint,
    pub tx_frequency: f64,
    pub updated_at: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Upserts a transaction by hash and, in the same serializable
    /// transaction, advances `total_txs`, `failed_txs`, `avg_gas` and
    /// `last_processed_block` for its contract (invariants 2–4).
    ///
    /// A duplicate `hash` is a no-op: returns `Ok(Duplicate)` without
    /// touching counters.
    async fn record_transaction(&self, tx: &Transaction) -> Result<RecordOutcome, StoreError>;

    async fn get_contract(&self, address: &Address) -> Result<Option<Contract>, StoreError>;

    async fn list_monitored_contracts(&self) -> Result<Vec<Contract>, StoreError>;

    async fn update_contract_status(
        &self,
        address: &Address,
        status: ContractStatus,
        message: Option<String>,
    ) -> Result<(), StoreError>;

    async fn insert_finding(&self, finding: &Finding) -> Result<(), StoreError>;

    async fn mark_finding_validated(&self, finding_id: &str) -> Result<(), StoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Updates an existing alert in place (used for the backfill progress
    /// `SYSTEM` alert, which is updated repeatedly then deleted).
    async fn update_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn delete_alert(&self, alert_id: &str) -> Result<(), StoreError>;

    async fn insert_failed_monitor(&self, failed: &FailedMonitor) -> Result<(), StoreError>;

    /// Successful transactions for `address` with `timestamp >= since`,
    /// for baseline recomputation (§4.6).
    async fn recent_successful_transactions(
        &self,
        address: &Address,
        since: i64,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn update_baseline(
        &self,
        address: &Address,
        update: BaselineUpdate,
    ) -> Result<(), StoreError>;

    async fn upsert_function_gas_profile(
        &self,
        profile: &FunctionGasProfile,
    ) -> Result<(), StoreError>;
}
