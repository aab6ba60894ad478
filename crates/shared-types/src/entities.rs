//! # Core Domain Entities
//!
//! Defines the persisted entities shared across the monitoring engine, as
//! specified in the data model: User, Contract, Transaction, Finding, Alert,
//! `FailedMonitor` and `FunctionGasProfile`.
//!
//! ## Clusters
//!
//! - **Identity**: User, Contract
//! - **Chain activity**: Transaction
//! - **Security findings**: Finding, Alert, `FailedMonitor`
//! - **Baselines**: `FunctionGasProfile`

use serde::{Deserialize, Serialize};
use std::fmt;

/// A lowercase, `0x`-prefixed, 40 hex-char Ethereum-style address.
///
/// All addresses that cross a persistence or network boundary must be
/// normalized through [`Address::normalize`] before comparison; invariant 1
/// of the data model forbids mixed-case storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Builds a normalized address from any hex representation.
    ///
    /// Lowercases the input and ensures a `0x` prefix. Does not validate
    /// length; malformed addresses are rejected by callers at the network
    /// boundary (e.g. the history source adapter), not here.
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("0x") {
            Self(lower)
        } else {
            Self(format!("0x{lower}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

/// A 32-byte transaction hash, rendered as `0x`-prefixed lowercase hex.
///
/// Serves as the global unique key for [`Transaction`] rows (invariant 2).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("0x") {
            Self(lower)
        } else {
            Self(format!("0x{lower}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxHash {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

/// Network a contract is monitored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testnet => f.write_str("testnet"),
            Self::Mainnet => f.write_str("mainnet"),
        }
    }
}

/// Lifecycle status of a monitored [`Contract`].
///
/// State machine per §4.7: `pending -> analyzing -> healthy <-> warning
/// <-> critical -> error/stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Pending,
    Analyzing,
    Healthy,
    Warning,
    Critical,
    Error,
    Stopped,
}

impl Default for ContractStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A monitored smart contract.
///
/// Address is globally unique and lowercase (invariant 1). `owner_id =
/// None` marks the contract public. The core never deletes a contract; it
/// only transitions `status` (e.g. to `Error` after repeated ingestion
/// failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub address: Address,
    pub name: Option<String>,
    pub network: Network,
    pub status: ContractStatus,
    pub status_message: Option<String>,
    pub owner_id: Option<String>,
    pub total_txs: u64,
    pub failed_txs: u64,
    pub avg_gas: u64,
    /// Big-integer block height; stored and transmitted as a decimal string.
    pub last_processed_block: BigUint,
    pub baseline_gas: u64,
    pub baseline_gas_std_dev: u64,
    pub baseline_tx_frequency: f64,
    pub baseline_value: BigUint,
    pub baseline_value_std_dev: BigUint,
    pub baseline_last_updated: Option<i64>,
    pub last_activity: Option<i64>,
    pub created_at: i64,
}

impl Contract {
    /// A freshly created, unmonitored contract.
    pub fn new(id: String, address: Address, network: Network, created_at: i64) -> Self {
        Self {
            id,
            address,
            name: None,
            network,
            status: ContractStatus::Pending,
            status_message: None,
            owner_id: None,
            total_txs: 0,
            failed_txs: 0,
            avg_gas: 0,
            last_processed_block: BigUint::zero(),
            baseline_gas: 0,
            baseline_gas_std_dev: 0,
            baseline_tx_frequency: 0.0,
            baseline_value: BigUint::zero(),
            baseline_value_std_dev: BigUint::zero(),
            baseline_last_updated: None,
            last_activity: None,
            created_at,
        }
    }

    pub fn is_public(&self) -> bool {
        self.owner_id.is_none()
    }
}

/// Execution outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

/// A single mined transaction touching a monitored contract.
///
/// `hash` is the unique dedup key (invariant 2); `contract_address` must
/// equal `to` or `from` of some monitored contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    /// Value in wei, arbitrary precision, serialized as a decimal string.
    pub value: BigUint,
    pub gas_used: u64,
    pub status: TxStatus,
    pub block_number: BigUint,
    pub timestamp: i64,
    pub contract_address: Address,
}

/// Severity scale shared by findings and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// A single heuristic firing on a transaction. Not yet user-facing; becomes
/// an [`Alert`] only once the validation queue confirms it (or never).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub contract_address: Address,
    pub r#type: String,
    pub severity: Severity,
    pub rule_confidence: f64,
    pub function_name: Option<String>,
    pub line: Option<u32>,
    pub code_snippet: Option<String>,
    pub description: String,
    pub validated: bool,
    pub created_at: i64,
}

/// A user-visible security event. Created only after the validator
/// confirms a finding, or directly by the supervisor for operational
/// events such as `MONITORING_FAILURE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub contract_address: Address,
    pub r#type: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: Option<String>,
    pub dismissed: bool,
    pub llm_valid: Option<bool>,
    pub llm_confidence: Option<f64>,
    pub llm_reason: Option<String>,
    pub llm_context: Option<String>,
    pub created_at: i64,
}

/// Appended when supervision abandons a contract after exhausting its
/// retry budget (§4.2, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedMonitor {
    pub id: String,
    pub contract_address: Address,
    pub network: Network,
    pub reason: String,
    pub attempts: u32,
    pub last_attempt: i64,
    pub resolved: bool,
}

/// Per-function gas statistics, keyed by `(contract_address,
/// function_selector)`. Until per-selector input data is available, the
/// baseline job upserts a single placeholder-selector row (§9, open
/// question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionGasProfile {
    pub contract_address: Address,
    pub function_selector: String,
    pub function_name: Option<String>,
    pub avg_gas: u64,
    pub min_gas: u64,
    pub max_gas: u64,
    pub std_dev_gas: u64,
    pub call_count: u64,
    pub last_updated: i64,
}

/// Placeholder function selector used until per-transaction input data is
/// captured by the store (open question, §9).
pub const PLACEHOLDER_FUNCTION_SELECTOR: &str = "0x00000000";

mod biguint;
pub use biguint::BigUint;
