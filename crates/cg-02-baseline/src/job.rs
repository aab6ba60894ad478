//! The baseline recomputation job (C7, §4.6).
//!
//! Runs once at startup and then every 6 hours: for every monitored
//! contract, pulls the last 7 days of successful transactions, recomputes
//! [`crate::stats::BaselineStats`], and writes them back through the
//! [`Store`] port. Must never block ingestion — callers run it on its own
//! task.

use shared_types::entities::{Address, FunctionGasProfile, PLACEHOLDER_FUNCTION_SELECTOR};
use shared_types::errors::StoreError;
use shared_types::store::{BaselineUpdate, Store};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::stats::{self, BaselineStats};

const SEVEN_DAYS_SECONDS: i64 = 7 * 24 * 60 * 60;
const RUN_INTERVAL: std::time::Duration = std::time::Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of one completed run, for logging/metrics by the caller.
#[derive(Debug, Clone, Default)]
pub struct BaselineRunSummary {
    pub contracts_considered: usize,
    pub contracts_updated: usize,
    pub contracts_skipped_insufficient_samples: usize,
}

pub struct BaselineJob {
    store: Arc<dyn Store>,
}

impl BaselineJob {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Runs a single recomputation pass over every monitored contract.
    pub async fn run_once(&self, now: i64) -> Result<BaselineRunSummary, BaselineError> {
        let contracts = self.store.list_monitored_contracts().await?;
        let mut summary = BaselineRunSummary {
            contracts_considered: contracts.len(),
            ..Default::default()
        };

        for contract in contracts {
            match self.recompute_one(&contract.address, now).await {
                Ok(true) => summary.contracts_updated += 1,
                Ok(false) => summary.contracts_skipped_insufficient_samples += 1,
                Err(e) => warn!(
                    contract = %contract.address,
                    error = %e,
                    "baseline recomputation failed for contract, continuing with the rest"
                ),
            }
        }

        info!(
            considered = summary.contracts_considered,
            updated = summary.contracts_updated,
            skipped = summary.contracts_skipped_insufficient_samples,
            "baseline job run complete"
        );
        Ok(summary)
    }

    /// Recomputes and persists the baseline for a single contract.
    /// Returns `Ok(false)` (not an error) when there are too few samples.
    async fn recompute_one(&self, address: &Address, now: i64) -> Result<bool, BaselineError> {
        let since = now - SEVEN_DAYS_SECONDS;
        let txs = self
            .store
            .recent_successful_transactions(address, since)
            .await?;

        let Some(stats) = stats::compute(&txs) else {
            debug!(contract = %address, samples = txs.len(), "skipping baseline, too few samples");
            return Ok(false);
        };

        self.store
            .update_baseline(address, to_baseline_update(&stats, now))
            .await?;

        self.store
            .upsert_function_gas_profile(&placeholder_profile(address, &stats, now))
            .await?;

        Ok(true)
    }

    /// Runs [`Self::run_once`] immediately, then every 6 hours, until
    /// `shutdown` fires. `now` is supplied by the caller on every tick so
    /// the job never reaches for a wall clock directly.
    pub async fn run_forever(
        &self,
        mut now: impl FnMut() -> i64 + Send,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        if let Err(e) = self.run_once(now()).await {
            warn!(error = %e, "initial baseline run failed");
        }

        let mut interval = tokio::time::interval(RUN_INTERVAL);
        interval.tick().await; // first tick fires immediately; already ran above

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once(now()).await {
                        warn!(error = %e, "baseline run failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("baseline job shutting down");
                        break;
                    }
                }
            }
        }
    }
}

fn to_baseline_update(stats: &BaselineStats, now: i64) -> BaselineUpdate {
    BaselineUpdate {
        avg_gas: stats.avg_gas,
        gas_std_dev: stats.gas_std_dev,
        avg_value: stats.avg_value,
        value_std_dev: stats.value_std_dev,
        tx_frequency: stats.tx_frequency,
        updated_at: now,
    }
}

fn placeholder_profile(
    address: &Address,
    stats: &BaselineStats,
    now: i64,
) -> FunctionGasProfile {
    FunctionGasProfile {
        contract_address: address.clone(),
        function_selector: PLACEHOLDER_FUNCTION_SELECTOR.to_string(),
        function_name: None,
        avg_gas: stats.avg_gas,
        min_gas: stats.min_gas,
        max_gas: stats.max_gas,
        std_dev_gas: stats.gas_std_dev,
        call_count: stats.sample_count,
        last_updated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared_types::entities::{
        Alert, BigUint, Contract, ContractStatus, FailedMonitor, Finding, Network, Transaction,
        TxHash, TxStatus,
    };
    use shared_types::store::RecordOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        contracts: Mutex<Vec<Contract>>,
        transactions: Mutex<Vec<Transaction>>,
        baseline_updates: Mutex<Vec<(Address, BaselineUpdate)>>,
        profiles: Mutex<Vec<FunctionGasProfile>>,
    }

    #[async_trait]
    impl Store for FakeStore {
        async fn record_transaction(&self, _tx: &Transaction) -> Result<RecordOutcome, StoreError> {
            unimplemented!()
        }
        async fn get_contract(&self, _address: &Address) -> Result<Option<Contract>, StoreError> {
            unimplemented!()
        }
        async fn list_monitored_contracts(&self) -> Result<Vec<Contract>, StoreError> {
            Ok(self.contracts.lock().unwrap().clone())
        }
        async fn update_contract_status(
            &self,
            _address: &Address,
            _status: ContractStatus,
            _message: Option<String>,
        ) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn insert_finding(&self, _finding: &Finding) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn mark_finding_validated(&self, _finding_id: &str) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn insert_alert(&self, _alert: &Alert) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn update_alert(&self, _alert: &Alert) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn delete_alert(&self, _alert_id: &str) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn insert_failed_monitor(&self, _failed: &FailedMonitor) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn recent_successful_transactions(
            &self,
            _address: &Address,
            _since: i64,
        ) -> Result<Vec<Transaction>, StoreError> {
            Ok(self.transactions.lock().unwrap().clone())
        }
        async fn update_baseline(
            &self,
            address: &Address,
            update: BaselineUpdate,
        ) -> Result<(), StoreError> {
            self.baseline_updates
                .lock()
                .unwrap()
                .push((address.clone(), update));
            Ok(())
        }
        async fn upsert_function_gas_profile(
            &self,
            profile: &FunctionGasProfile,
        ) -> Result<(), StoreError> {
            self.profiles.lock().unwrap().push(profile.clone());
            Ok(())
        }
    }

    fn contract(addr: &str) -> Contract {
        Contract::new(addr.to_string(), Address::from(addr), Network::Testnet, 0)
    }

    fn tx(gas: u64) -> Transaction {
        Transaction {
            id: "id".to_string(),
            hash: TxHash::from("0xabc"),
            from: Address::from("0xfrom"),
            to: Some(Address::from("0xto")),
            value: BigUint::from_u64(1),
            gas_used: gas,
            status: TxStatus::Success,
            block_number: BigUint::zero(),
            timestamp: 0,
            contract_address: Address::from("0xto"),
        }
    }

    #[tokio::test]
    async fn skips_contract_with_too_few_samples() {
        let store = Arc::new(FakeStore {
            contracts: Mutex::new(vec![contract("0xc")]),
            transactions: Mutex::new(vec![tx(21_000); 3]),
            ..Default::default()
        });
        let job = BaselineJob::new(store.clone());
        let summary = job.run_once(0).await.unwrap();
        assert_eq!(summary.contracts_skipped_insufficient_samples, 1);
        assert!(store.baseline_updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn updates_contract_with_enough_samples() {
        let store = Arc::new(FakeStore {
            contracts: Mutex::new(vec![contract("0xc")]),
            transactions: Mutex::new(vec![tx(21_000); 10]),
            ..Default::default()
        });
        let job = BaselineJob::new(store.clone());
        let summary = job.run_once(0).await.unwrap();
        assert_eq!(summary.contracts_updated, 1);
        assert_eq!(store.baseline_updates.lock().unwrap().len(), 1);
        assert_eq!(store.profiles.lock().unwrap().len(), 1);
    }
}
