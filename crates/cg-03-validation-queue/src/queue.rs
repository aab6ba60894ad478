//! The priority FIFO and its single-worker scheduler loop (§4.4).

use crate::rate::{Budget, RateWindow, COST_PER_ITEM};
use crate::types::{QueueItem, QueueStats};
use crate::validator::{FindingPayload, ValidationRequest, Validator, ValidatorOutcome};
use shared_types::entities::{Alert, Contract};
use shared_types::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Single worker, as specified (§4.4 "MAX_CONCURRENT=1"): `tick` pops and
/// fully resolves one item before the next call, so there is never more
/// than one in-flight validator request.

/// Exhausted after this many failed attempts against the validator
/// (§4.4 step 4, §7 "Validator" recovery).
const MAX_ATTEMPTS: u32 = 3;

const IDLE_SLEEP: Duration = Duration::from_millis(200);

/// In-memory priority FIFO plus rate/budget counters. Owned by a single
/// task ([`ValidationEngine::run_forever`]); other tasks only call
/// [`ValidationQueue::enqueue`]/[`ValidationQueue::pause`]/stats methods,
/// which take the same internal lock, so this is safe to share via `Arc`.
pub struct ValidationQueue {
    items: Vec<QueueItem>,
    manual_pause: bool,
    completed: u64,
    failed: u64,
    rate: RateWindow,
    budget: Budget,
}

impl ValidationQueue {
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self {
            items: Vec::new(),
            manual_pause: false,
            completed: 0,
            failed: 0,
            rate: RateWindow::new(),
            budget: Budget::new(now),
        }
    }

    /// Rejects a duplicate `finding.id`; otherwise sorted-inserts by
    /// `(priorityRank ASC, enqueuedAt ASC)` (§4.4, invariant 8).
    pub fn enqueue(&mut self, finding: shared_types::entities::Finding, now: i64) -> bool {
        if self.items.iter().any(|i| i.id == finding.id) {
            return false;
        }
        let item = QueueItem::new(finding, now);
        let pos = self
            .items
            .partition_point(|i| (i.priority, i.enqueued_at) <= (item.priority, item.enqueued_at));
        self.items.insert(pos, item);
        true
    }

    pub fn pause(&mut self) {
        self.manual_pause = true;
    }

    pub fn resume(&mut self) {
        self.manual_pause = false;
    }

    pub fn stats(&mut self, now: i64) -> QueueStats {
        QueueStats {
            waiting: self.items.len(),
            active: 0,
            completed: self.completed,
            failed: self.failed,
            total_cost: self.budget.total_spent(now),
            budget_remaining: self.budget.remaining(now),
            rate_window_used: self.rate.used(now),
            rate_window_capacity: crate::rate::RATE_LIMIT_PER_WINDOW,
            paused: self.manual_pause || self.budget.is_exhausted(now),
        }
    }

    fn pop_next(&mut self) -> Option<QueueItem> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }
}

/// Drives the queue's single worker: pops the highest-priority item,
/// posts it to the validator with retry, and persists the outcome
/// (§4.4 "Per-item execution").
pub struct ValidationEngine<V: Validator> {
    queue: Arc<Mutex<ValidationQueue>>,
    validator: Arc<V>,
    store: Arc<dyn Store>,
}

impl<V: Validator> ValidationEngine<V> {
    #[must_use]
    pub fn new(queue: Arc<Mutex<ValidationQueue>>, validator: Arc<V>, store: Arc<dyn Store>) -> Self {
        Self {
            queue,
            validator,
            store,
        }
    }

    /// Runs the scheduler loop until `shutdown` fires (§5 "the validation
    /// queue runs as a single worker task").
    pub async fn run_forever(
        &self,
        mut now: impl FnMut() -> i64 + Send,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                info!("validation queue shutting down");
                break;
            }
            let ts = now();
            match self.tick(ts).await {
                TickOutcome::Idle | TickOutcome::RateLimited | TickOutcome::Paused => {
                    tokio::select! {
                        () = tokio::time::sleep(IDLE_SLEEP) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                TickOutcome::Processed => {}
            }
        }
    }

    /// Runs exactly one scheduling decision; exposed directly for tests
    /// so retry/backoff timing doesn't depend on real sleeps.
    pub async fn tick(&self, now: i64) -> TickOutcome {
        let candidate = {
            let mut q = self.queue.lock().await;
            if q.manual_pause || q.budget.is_exhausted(now) {
                return TickOutcome::Paused;
            }
            if q.rate.is_exhausted(now) {
                return TickOutcome::RateLimited;
            }
            q.pop_next()
        };

        let Some(mut item) = candidate else {
            return TickOutcome::Idle;
        };

        let contract = match self.store.get_contract(&item.finding.contract_address).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to load contract context for validation");
                None
            }
        };

        let request = attach_context(build_request(&item), contract.as_ref());

        match self.validator.validate(request).await {
            Ok(outcome) => {
                self.on_success(&item, outcome, now).await;
            }
            Err(err) => {
                item.attempts += 1;
                if item.attempts >= MAX_ATTEMPTS {
                    warn!(finding = %item.id, error = %err, "validator exhausted retries, dropping");
                    let mut q = self.queue.lock().await;
                    q.failed += 1;
                } else {
                    warn!(finding = %item.id, attempt = item.attempts, error = %err, "validator call failed, retrying");
                    let backoff = Duration::from_secs(2u64.saturating_pow(item.attempts));
                    tokio::time::sleep(backoff).await;
                    let mut q = self.queue.lock().await;
                    q.items.insert(0, item);
                }
            }
        }

        {
            let mut q = self.queue.lock().await;
            q.rate.record(now);
            q.budget.record_spend(now, COST_PER_ITEM);
        }

        TickOutcome::Processed
    }

    async fn on_success(&self, item: &QueueItem, outcome: ValidatorOutcome, now: i64) {
        if let Err(e) = self.store.mark_finding_validated(&item.id).await {
            warn!(finding = %item.id, error = %e, "failed to mark finding validated");
        }

        match outcome {
            ValidatorOutcome::Invalid => {
                let mut q = self.queue.lock().await;
                q.completed += 1;
            }
            ValidatorOutcome::Valid {
                confidence,
                severity,
                reason,
                recommendation,
                additional_context,
            } => {
                let alert = Alert {
                    id: uuid::Uuid::new_v4().to_string(),
                    contract_address: item.finding.contract_address.clone(),
                    r#type: item.finding.r#type.clone(),
                    severity,
                    description: reason.clone().unwrap_or_else(|| item.finding.description.clone()),
                    recommendation,
                    dismissed: false,
                    llm_valid: Some(true),
                    llm_confidence: Some(confidence),
                    llm_reason: reason,
                    llm_context: additional_context,
                    created_at: now,
                };
                if let Err(e) = self.store.insert_alert(&alert).await {
                    warn!(finding = %item.id, error = %e, "failed to persist validator-confirmed alert");
                }
                let mut q = self.queue.lock().await;
                q.completed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Processed,
    Idle,
    RateLimited,
    Paused,
}

fn build_request(item: &QueueItem) -> ValidationRequest {
    ValidationRequest {
        finding: FindingPayload::from(&item.finding),
        contract_context: serde_json::Value::Null,
        similar_cases: Vec::new(),
        session_id: uuid::Uuid::new_v4().to_string(),
    }
}

fn attach_context(mut request: ValidationRequest, contract: Option<&Contract>) -> ValidationRequest {
    if let Some(c) = contract {
        request.contract_context = serde_json::json!({
            "address": c.address.as_str(),
            "network": c.network.to_string(),
            "totalTxs": c.total_txs,
            "failedTxs": c.failed_txs,
            "avgGas": c.avg_gas,
        });
    }
    request
}
