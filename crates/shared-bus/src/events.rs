//! # Push Events
//!
//! Defines the tagged variants fanned out to browser clients over the
//! push channel (§4.3, §9 "ad-hoc any-typed event payloads -> tagged
//! variants"). Every variant carries its `contract_address` so a
//! subscriber can filter per contract in addition to per topic.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, Alert, Contract, Finding, Transaction};

/// All events the supervisor fans out to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PushEvent {
    /// A newly ingested transaction for a monitored contract.
    Transaction {
        contract_address: Address,
        transaction: Transaction,
    },

    /// A single finding produced by the risk engine for one transaction.
    NewFinding {
        contract_address: Address,
        finding: Finding,
    },

    /// The full set of findings produced for one transaction (emitted
    /// alongside individual `NewFinding`s so clients that only care about
    /// totals don't need to accumulate them).
    NewFindings {
        contract_address: Address,
        findings: Vec<Finding>,
    },

    /// A contract's persisted fields changed (status, counters, baseline).
    ContractUpdate {
        contract_address: Address,
        contract: Contract,
    },

    /// Backfill analysis replay progress, emitted every 10 transactions.
    BackfillAnalysisProgress {
        contract_address: Address,
        processed: u64,
        total: u64,
    },

    /// Backfill analysis replay finished.
    BackfillAnalysisComplete {
        contract_address: Address,
        processed: u64,
    },

    /// The supervisor abandoned a contract after exhausting its retry
    /// budget; carries the operational alert that was also persisted.
    MonitoringFailure {
        contract_address: Address,
        alert: Alert,
    },
}

impl PushEvent {
    pub fn contract_address(&self) -> &Address {
        match self {
            Self::Transaction { contract_address, .. }
            | Self::NewFinding { contract_address, .. }
            | Self::NewFindings { contract_address, .. }
            | Self::ContractUpdate { contract_address, .. }
            | Self::BackfillAnalysisProgress { contract_address, .. }
            | Self::BackfillAnalysisComplete { contract_address, .. }
            | Self::MonitoringFailure { contract_address, .. } => contract_address,
        }
    }

    #[must_use]
    pub fn topic(&self) -> PushTopic {
        match self {
            Self::Transaction { .. } => PushTopic::Transaction,
            Self::NewFinding { .. } => PushTopic::NewFinding,
            Self::NewFindings { .. } => PushTopic::NewFindings,
            Self::ContractUpdate { .. } => PushTopic::ContractUpdate,
            Self::BackfillAnalysisProgress { .. } => PushTopic::BackfillAnalysisProgress,
            Self::BackfillAnalysisComplete { .. } => PushTopic::BackfillAnalysisComplete,
            Self::MonitoringFailure { .. } => PushTopic::MonitoringFailure,
        }
    }
}

/// Named topics clients subscribe to (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTopic {
    Transaction,
    NewFinding,
    NewFindings,
    ContractUpdate,
    BackfillAnalysisProgress,
    BackfillAnalysisComplete,
    MonitoringFailure,
}

impl PushTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::NewFinding => "new_finding",
            Self::NewFindings => "new_findings",
            Self::ContractUpdate => "contract_update",
            Self::BackfillAnalysisProgress => "backfill_analysis_progress",
            Self::BackfillAnalysisComplete => "backfill_analysis_complete",
            Self::MonitoringFailure => "monitoring_failure",
        }
    }
}

/// A subscription filter: an optional contract scope and an optional
/// topic set. Both empty/`None` means "receive everything" — the
/// wildcard fan-out the push channel contract requires (§6).
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub contract: Option<Address>,
    pub topics: Vec<PushTopic>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_contract(address: Address) -> Self {
        Self {
            contract: Some(address),
            topics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_topics(mut self, topics: Vec<PushTopic>) -> Self {
        self.topics = topics;
        self
    }

    #[must_use]
    pub fn matches(&self, event: &PushEvent) -> bool {
        if let Some(contract) = &self.contract {
            if contract != event.contract_address() {
                return false;
            }
        }
        if self.topics.is_empty() {
            return true;
        }
        self.topics.contains(&event.topic())
    }
}
