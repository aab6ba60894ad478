//! The engine's input and output shapes.
//!
//! [`TxView`] is deliberately narrower than [`shared_types::entities::Transaction`]:
//! the engine only ever needs the fields heuristics read, and keeping it
//! separate means a caller can evaluate a transaction before it has an
//! `id` or has been persisted.

use shared_types::entities::{Address, BigUint, Network, TxHash, TxStatus};

/// The slice of a transaction the risk engine scores.
#[derive(Debug, Clone)]
pub struct TxView {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub value: BigUint,
    pub gas_used: u64,
    pub status: TxStatus,
    pub network: Network,
}

/// Discrete risk bucket over the composite score (§4.1 mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// `SAFE<10, LOW<30, MEDIUM<65, HIGH<80, CRITICAL>=80`.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=9 => Self::Safe,
            10..=29 => Self::Low,
            30..=64 => Self::Medium,
            65..=79 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Safe => "SAFE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// A heuristic firing, before it is turned into a persisted
/// [`shared_types::entities::Finding`] (which also needs an id,
/// contract address and timestamp the engine does not own).
#[derive(Debug, Clone)]
pub struct HeuristicFinding {
    pub r#type: &'static str,
    pub severity: shared_types::entities::Severity,
    pub rule_confidence: f64,
    pub function_name: Option<String>,
    pub description: String,
    /// This heuristic's contribution to the composite score, 0..=100.
    pub score: u8,
    /// Short label used to derive `primaryFactor` when this is the winner.
    pub label: &'static str,
}

/// Output of [`crate::evaluate`].
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    /// Short label of the heuristic with the highest score contribution,
    /// or `"none"` if nothing fired.
    pub primary_factor: String,
    pub findings: Vec<HeuristicFinding>,
}
