//! Per-contract ingestion state machine (§4.2, §5): backfill on startup,
//! primary block-watcher mode, polling fallback on watcher failure, and
//! periodic reconnection attempts, all cancellable via a single token.

use crate::pipeline::Pipeline;
use crate::ports::{ChainBlock, ChainError, ChainEventSource, ChainReceipt, ChainTx, HistorySource, HistoryTx};
use crate::retry;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use shared_bus::{EventPublisher, PushEvent};
use shared_types::entities::{
    Address, Alert, BigUint, ContractStatus, FailedMonitor, Network, Severity, Transaction, TxStatus,
};
use shared_types::errors::StoreError;
use shared_types::store::Store;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Notified when a contract's bring-up retry budget is exhausted, so the
/// supervisor can record the failure and stop tracking this ingester
/// (§4.2 "Supervisor", §7 "MONITORING_FAILURE").
#[async_trait]
pub trait IngesterFailureHandler: Send + Sync {
    async fn on_bring_up_exhausted(&self, address: &Address, network: Network, reason: String, now: i64);
}

enum WatchOutcome {
    Cancelled,
    Disconnected,
}

pub struct Ingester<C: ChainEventSource, H: HistorySource> {
    address: Address,
    network: Network,
    chain: Arc<C>,
    history: Arc<H>,
    store: Arc<dyn Store>,
    pipeline: Arc<Pipeline>,
    freq: Arc<Mutex<cg_01_risk_engine::FrequencyTracker>>,
    bus: Arc<dyn EventPublisher>,
    cancel: CancellationToken,
    failure_handler: Arc<dyn IngesterFailureHandler>,
}

impl<C: ChainEventSource, H: HistorySource> Clone for Ingester<C, H> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            network: self.network,
            chain: self.chain.clone(),
            history: self.history.clone(),
            store: self.store.clone(),
            pipeline: self.pipeline.clone(),
            freq: self.freq.clone(),
            bus: self.bus.clone(),
            cancel: self.cancel.clone(),
            failure_handler: self.failure_handler.clone(),
        }
    }
}

impl<C: ChainEventSource + 'static, H: HistorySource + 'static> Ingester<C, H> {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        address: Address,
        network: Network,
        chain: Arc<C>,
        history: Arc<H>,
        store: Arc<dyn Store>,
        pipeline: Arc<Pipeline>,
        bus: Arc<dyn EventPublisher>,
        failure_handler: Arc<dyn IngesterFailureHandler>,
    ) -> Self {
        Self {
            address,
            network,
            chain,
            history,
            store,
            pipeline,
            freq: Arc::new(Mutex::new(cg_01_risk_engine::FrequencyTracker::new())),
            bus,
            cancel: CancellationToken::new(),
            failure_handler,
        }
    }

    /// Cancels this ingester's background task at its next suspension
    /// point (§5 "`stop(address)` leaves no orphaned work").
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Bring-up, backfill, then the watch/poll loop, until cancelled or
    /// the bring-up retry budget is exhausted. `now_fn` is sampled fresh
    /// at every step rather than read from a wall clock directly, so this
    /// stays deterministically testable (§4.6/§4.4 convention).
    pub async fn run(self, mut now_fn: impl FnMut() -> i64 + Send) {
        let Some(mut stream) = self.bring_up(&mut now_fn).await else {
            return;
        };

        if let Err(e) = self.backfill(now_fn()).await {
            warn!(contract = %self.address, error = %e, "backfill failed, continuing with live ingestion");
        }

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.run_watching(&mut stream, &mut now_fn).await {
                WatchOutcome::Cancelled => break,
                WatchOutcome::Disconnected => match self.run_polling(&mut now_fn).await {
                    Some(new_stream) => stream = new_stream,
                    None => break,
                },
            }
        }

        info!(contract = %self.address, "ingester task exiting");
    }

    /// Repeatedly attempts to open the block-watcher subscription with
    /// exponential backoff (§4.2 "Failure model"). Returns `None` once
    /// the retry budget is exhausted or the task is cancelled first,
    /// after notifying [`IngesterFailureHandler`] in the former case.
    async fn bring_up(
        &self,
        now_fn: &mut impl FnMut() -> i64,
    ) -> Option<BoxStream<'static, Result<BigUint, ChainError>>> {
        for attempt in 0..retry::BRING_UP_MAX_ATTEMPTS {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.chain.watch_blocks().await {
                Ok(stream) => {
                    info!(contract = %self.address, attempt, "block watcher subscription established");
                    return Some(stream);
                }
                Err(e) => {
                    warn!(contract = %self.address, attempt, error = %e, "block watcher subscription failed, retrying");
                    let delay = retry::bring_up_backoff(attempt);
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.cancel.cancelled() => return None,
                    }
                }
            }
        }

        let reason = format!(
            "block watcher subscription failed after {} attempts",
            retry::BRING_UP_MAX_ATTEMPTS
        );
        warn!(contract = %self.address, "bring-up retry budget exhausted");

        if let Err(e) = self
            .store
            .update_contract_status(&self.address, ContractStatus::Error, Some(reason.clone()))
            .await
        {
            warn!(contract = %self.address, error = %e, "failed to mark contract status error");
        }

        let failed = FailedMonitor {
            id: Uuid::new_v4().to_string(),
            contract_address: self.address.clone(),
            network: self.network,
            reason: reason.clone(),
            attempts: retry::BRING_UP_MAX_ATTEMPTS,
            last_attempt: now_fn(),
            resolved: false,
        };
        if let Err(e) = self.store.insert_failed_monitor(&failed).await {
            warn!(contract = %self.address, error = %e, "failed to persist failed monitor record");
        }

        self.failure_handler
            .on_bring_up_exhausted(&self.address, self.network, reason, now_fn())
            .await;

        None
    }

    /// Replays transaction history from the contract's last processed
    /// block through the pipeline, with a `SYSTEM` alert updated every 10
    /// transactions and deleted on completion (§4.2 backfill, §4.7).
    async fn backfill(&self, now: i64) -> Result<(), StoreError> {
        let Some(contract) = self.store.get_contract(&self.address).await? else {
            return Ok(());
        };

        let txs = match self
            .history
            .list_transactions(&self.address, &contract.last_processed_block)
            .await
        {
            Ok(txs) => txs,
            Err(e) => {
                warn!(contract = %self.address, error = %e, "backfill history fetch failed, skipping");
                return Ok(());
            }
        };

        if txs.is_empty() {
            self.store
                .update_contract_status(&self.address, ContractStatus::Healthy, None)
                .await?;
            return Ok(());
        }

        self.store
            .update_contract_status(&self.address, ContractStatus::Analyzing, None)
            .await?;

        let total = txs.len() as u64;
        let alert_id = Uuid::new_v4().to_string();
        let mut progress_alert = Alert {
            id: alert_id.clone(),
            contract_address: self.address.clone(),
            r#type: "SYSTEM".into(),
            severity: Severity::Info,
            description: format!("Backfill analysis in progress: 0/{total}"),
            recommendation: None,
            dismissed: false,
            llm_valid: None,
            llm_confidence: None,
            llm_reason: None,
            llm_context: None,
            created_at: now,
        };
        self.store.insert_alert(&progress_alert).await?;

        let mut processed: u64 = 0;
        {
            let mut freq = self.freq.lock().await;
            for history_tx in txs {
                let tx = to_transaction_from_history(&history_tx, &self.address);
                if let Err(e) = self.pipeline.process(tx, self.network, &mut freq, now).await {
                    warn!(contract = %self.address, error = %e, "backfill transaction processing failed");
                    continue;
                }
                processed += 1;

                if processed % 10 == 0 {
                    progress_alert.description = format!("Backfill analysis in progress: {processed}/{total}");
                    self.store.update_alert(&progress_alert).await.ok();
                    self.bus
                        .publish(PushEvent::BackfillAnalysisProgress {
                            contract_address: self.address.clone(),
                            processed,
                            total,
                        })
                        .await;
                }
            }
        }

        self.store.delete_alert(&alert_id).await.ok();
        self.bus
            .publish(PushEvent::BackfillAnalysisComplete {
                contract_address: self.address.clone(),
                processed,
            })
            .await;
        self.store
            .update_contract_status(&self.address, ContractStatus::Healthy, None)
            .await?;

        Ok(())
    }

    /// Consumes the block-watcher stream until it errors, ends, or the
    /// task is cancelled (§4.2 "Primary - block watcher").
    async fn run_watching(
        &self,
        stream: &mut BoxStream<'static, Result<BigUint, ChainError>>,
        now_fn: &mut impl FnMut() -> i64,
    ) -> WatchOutcome {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return WatchOutcome::Cancelled,
                item = stream.next() => {
                    match item {
                        Some(Ok(block_number)) => {
                            if let Err(e) = self.process_block(&block_number, now_fn()).await {
                                warn!(contract = %self.address, block = %block_number, error = %e, "failed to process block");
                            }
                        }
                        Some(Err(e)) => {
                            warn!(contract = %self.address, error = %e, "block watcher error, entering polling fallback");
                            return WatchOutcome::Disconnected;
                        }
                        None => {
                            warn!(contract = %self.address, "block watcher stream ended, entering polling fallback");
                            return WatchOutcome::Disconnected;
                        }
                    }
                }
            }
        }
    }

    /// Polls the history endpoint on a fixed cadence and attempts to
    /// re-establish the block watcher on a separate, shorter cadence
    /// (§4.2 "Secondary - polling fallback", §5 reconnection timer).
    async fn run_polling(
        &self,
        now_fn: &mut impl FnMut() -> i64,
    ) -> Option<BoxStream<'static, Result<BigUint, ChainError>>> {
        if let Err(e) = self.poll_once(now_fn()).await {
            warn!(contract = %self.address, error = %e, "polling fallback fetch failed");
        }

        let mut poll_timer = tokio::time::interval(retry::POLL_FALLBACK_INTERVAL);
        poll_timer.tick().await;
        let mut reconnect_timer = tokio::time::interval(retry::RECONNECT_INTERVAL);
        reconnect_timer.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return None,
                _ = poll_timer.tick() => {
                    if let Err(e) = self.poll_once(now_fn()).await {
                        warn!(contract = %self.address, error = %e, "polling fallback fetch failed");
                    }
                }
                _ = reconnect_timer.tick() => {
                    match self.chain.watch_blocks().await {
                        Ok(stream) => {
                            info!(contract = %self.address, "block watcher reconnected, leaving polling fallback");
                            return Some(stream);
                        }
                        Err(e) => {
                            warn!(contract = %self.address, error = %e, "watcher reconnect attempt failed");
                        }
                    }
                }
            }
        }
    }

    async fn poll_once(&self, now: i64) -> Result<(), StoreError> {
        let Some(contract) = self.store.get_contract(&self.address).await? else {
            return Ok(());
        };
        let txs = match self
            .history
            .list_transactions(&self.address, &contract.last_processed_block)
            .await
        {
            Ok(txs) => txs,
            Err(e) => {
                warn!(contract = %self.address, error = %e, "polling fallback list_transactions failed");
                return Ok(());
            }
        };

        let mut freq = self.freq.lock().await;
        for history_tx in txs {
            let tx = to_transaction_from_history(&history_tx, &self.address);
            if let Err(e) = self.pipeline.process(tx, self.network, &mut freq, now).await {
                warn!(contract = %self.address, error = %e, "polling fallback transaction processing failed");
            }
        }
        Ok(())
    }

    async fn process_block(&self, number: &BigUint, now: i64) -> Result<(), ChainError> {
        let block = self.chain.get_block_with_transactions(number).await?;
        let mut freq = self.freq.lock().await;
        for chain_tx in &block.transactions {
            if !self.touches_contract(chain_tx) {
                continue;
            }
            let receipt = match self.chain.get_transaction_receipt(&chain_tx.hash).await {
                Ok(Some(r)) => r,
                Ok(None) => {
                    warn!(contract = %self.address, tx = %chain_tx.hash, "receipt not yet available, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(contract = %self.address, tx = %chain_tx.hash, error = %e, "receipt fetch failed, skipping transaction");
                    continue;
                }
            };
            let tx = to_transaction_from_chain(chain_tx, &block, receipt, &self.address);
            if let Err(e) = self.pipeline.process(tx, self.network, &mut freq, now).await {
                warn!(contract = %self.address, error = %e, "failed to persist ingested transaction");
            }
        }
        Ok(())
    }

    fn touches_contract(&self, tx: &ChainTx) -> bool {
        tx.from == self.address || tx.to.as_ref() == Some(&self.address)
    }
}

fn to_transaction_from_chain(
    tx: &ChainTx,
    block: &ChainBlock,
    receipt: ChainReceipt,
    contract: &Address,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        hash: tx.hash.clone(),
        from: tx.from.clone(),
        to: tx.to.clone(),
        value: tx.value.clone(),
        gas_used: receipt.gas_used,
        status: receipt.status,
        block_number: block.number.clone(),
        timestamp: block.timestamp,
        contract_address: contract.clone(),
    }
}

fn to_transaction_from_history(tx: &HistoryTx, contract: &Address) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        hash: tx.hash.clone(),
        from: tx.from.clone(),
        to: tx.to.clone(),
        value: tx.value.clone(),
        gas_used: tx.gas_used,
        status: if tx.is_error { TxStatus::Failed } else { TxStatus::Success },
        block_number: tx.block_number.clone(),
        timestamp: tx.timestamp,
        contract_address: contract.clone(),
    }
}
