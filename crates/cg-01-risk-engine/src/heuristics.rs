//! The eight behavioral heuristics (H1–H8, §4.1).
//!
//! Each function takes the transaction view plus whatever frequency count
//! it needs and returns `Some(HeuristicFinding)` if it fires, `None`
//! otherwise. [`crate::evaluate`] runs all eight and takes the max score.

use crate::types::{HeuristicFinding, TxView};
use primitive_types::U256;
use shared_types::entities::{Severity, TxStatus};

/// Fixed-point scale for H1's fractional contributions (§4.1, §9 "never
/// down-cast [wei] to fixed 64-bit floats"). Every threshold comparison
/// against a wei value is exact `U256` arithmetic; this scale only carries
/// the sub-point precision of H1's additive terms through to the final
/// `round()`, the same way the spec's own weighted sum does in floating
/// point, but without ever widening a wei value into an `f64`.
const SCORE_SCALE: u64 = 1_000_000;

fn one_eth() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

fn ten_eth() -> U256 {
    one_eth() * U256::from(10u64)
}

fn twenty_five_eth() -> U256 {
    one_eth() * U256::from(25u64)
}

fn hundred_eth() -> U256 {
    one_eth() * U256::from(100u64)
}

/// Exact decimal ETH rendering (2 places) for finding descriptions, via
/// integer division/remainder rather than a float conversion.
fn format_eth(value: U256) -> String {
    let whole = value / one_eth();
    let remainder = value % one_eth();
    let frac = (remainder * U256::from(100u64)) / one_eth();
    format!("{whole}.{frac:02}")
}

/// H1 — flash-loan pattern. Weighted sum of four independent
/// contributions; fires only once the sum reaches 50.
pub fn flash_loan_pattern(tx: &TxView) -> Option<HeuristicFinding> {
    let value = tx.value.as_u256();
    let scale = U256::from(SCORE_SCALE);
    let mut total_scaled = U256::zero();

    if value > ten_eth() {
        // 10 + 5*(value/10 ETH) == 10 + value/(2 ETH), capped at 30.
        let frac = (value * scale) / (one_eth() * U256::from(2u64));
        let term = (U256::from(10u64) * scale + frac).min(U256::from(30u64) * scale);
        total_scaled += term;
    }
    if tx.gas_used > 300_000 {
        let over = U256::from(tx.gas_used - 300_000);
        let term = ((over * scale) / U256::from(10_000u64)).min(U256::from(20u64) * scale);
        total_scaled += term;
    }
    if tx.gas_used > 1_000_000 {
        total_scaled += U256::from(25u64) * scale;
    }
    if tx.status == TxStatus::Failed && value > hundred_eth() {
        total_scaled += U256::from(15u64) * scale;
    }

    if total_scaled < U256::from(50u64) * scale {
        return None;
    }

    let capped_scaled = total_scaled.min(U256::from(100u64) * scale);
    // round-half-up to the nearest whole point, same as the spec's `.round()`.
    let score = (((capped_scaled + scale / U256::from(2u64)) / scale).low_u64()) as u8;
    let severity = if score >= 80 {
        Severity::Critical
    } else if score >= 65 {
        Severity::High
    } else {
        Severity::Medium
    };

    Some(HeuristicFinding {
        r#type: "FLASH_LOAN_ATTACK",
        severity,
        rule_confidence: 0.8,
        function_name: None,
        description: format!(
            "Flash-loan-like pattern detected: value={} ETH, gas={}",
            format_eth(value),
            tx.gas_used
        ),
        score,
        label: "Flash loan pattern",
    })
}

/// H2 — high-frequency sender: more than 5 transactions in 60s from `from`.
pub fn high_frequency_sender(sender_count: usize) -> Option<HeuristicFinding> {
    if sender_count <= 5 {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "HIGH_FREQUENCY_BOT",
        severity: Severity::Medium,
        rule_confidence: 0.7,
        function_name: None,
        description: format!("{sender_count} transactions from the same sender within 60s"),
        score: 45,
        label: "High-frequency sender",
    })
}

/// H3 — DDoS on contract: more than 10 transactions in 60s to the same `to`.
pub fn ddos_on_contract(contract_count: usize) -> Option<HeuristicFinding> {
    if contract_count <= 10 {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "DDOS_ATTACK",
        severity: Severity::High,
        rule_confidence: 0.75,
        function_name: None,
        description: format!("{contract_count} transactions to the same contract within 60s"),
        score: 70,
        label: "DDoS on contract",
    })
}

/// H4 — high-value transfer: `value > 10 ETH`.
pub fn high_value_transfer(tx: &TxView) -> Option<HeuristicFinding> {
    let value = tx.value.as_u256();
    if value <= ten_eth() {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "SUSPICIOUS_ACTIVITY",
        severity: Severity::Medium,
        rule_confidence: 0.6,
        function_name: None,
        description: format!("High value transfer of {} ETH", format_eth(value)),
        score: 40,
        label: "High value transfer",
    })
}

/// H5 — failed high-gas: `status=failed AND gas>200_000`.
pub fn failed_high_gas(tx: &TxView) -> Option<HeuristicFinding> {
    if tx.status != TxStatus::Failed || tx.gas_used <= 200_000 {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "SUSPICIOUS_ACTIVITY",
        severity: Severity::Low,
        rule_confidence: 0.5,
        function_name: None,
        description: format!("Failed transaction with high gas usage ({} gas)", tx.gas_used),
        score: 25,
        label: "Failed high-gas",
    })
}

/// H6 — spam / state bloat: `gas>1_000_000 AND value=0`.
pub fn spam_state_bloat(tx: &TxView) -> Option<HeuristicFinding> {
    if tx.gas_used <= 1_000_000 || !tx.value.is_zero() {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "SPAM_ATTACK",
        severity: Severity::High,
        rule_confidence: 0.65,
        function_name: None,
        description: format!("Zero-value transaction consuming {} gas", tx.gas_used),
        score: 65,
        label: "Spam / state bloat",
    })
}

/// H7 — governance attack: `value > 25 ETH AND gas > 500_000`.
pub fn governance_attack(tx: &TxView) -> Option<HeuristicFinding> {
    let value = tx.value.as_u256();
    if value <= twenty_five_eth() || tx.gas_used <= 500_000 {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "GOVERNANCE_ATTACK",
        severity: Severity::Critical,
        rule_confidence: 0.85,
        function_name: None,
        description: format!(
            "Potential governance attack: value={} ETH, gas={}",
            format_eth(value),
            tx.gas_used
        ),
        score: 85,
        label: "Governance attack",
    })
}

/// H8 — contract deployment: `to` is absent. Purely informational; never
/// contributes to the composite score.
pub fn contract_deployment(tx: &TxView) -> Option<HeuristicFinding> {
    if tx.to.is_some() {
        return None;
    }
    Some(HeuristicFinding {
        r#type: "CONTRACT_DEPLOYMENT",
        severity: Severity::Info,
        rule_confidence: 1.0,
        function_name: None,
        description: "Contract deployment transaction".to_string(),
        score: 0,
        label: "Contract deployment",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{Address, BigUint, Network, TxHash};

    fn tx(value_wei: u128, gas_used: u64, status: TxStatus) -> TxView {
        TxView {
            hash: TxHash::from("0xaaaa"),
            from: Address::from("0xfrom"),
            to: Some(Address::from("0xto")),
            value: BigUint::from_u128(value_wei),
            gas_used,
            status,
            network: Network::Testnet,
        }
    }

    #[test]
    fn h1_does_not_fire_below_50() {
        // value alone: 11 ETH -> +min(30, 10+5.5)=15.5, well under 50.
        let t = tx(11_000_000_000_000_000_000, 100_000, TxStatus::Success);
        assert!(flash_loan_pattern(&t).is_none());
    }

    #[test]
    fn h1_fires_at_exactly_50() {
        // gas>300k: (500_000-300_000)/10_000 = 20 (capped). gas>1M: no.
        // value 60 ETH: min(30, 10+5*6)=30. total=50.
        let t = tx(60_000_000_000_000_000_000, 500_000, TxStatus::Success);
        let finding = flash_loan_pattern(&t).expect("H1 should fire at total=50");
        assert_eq!(finding.score, 50);
    }

    #[test]
    fn h1_severity_buckets_by_total_score() {
        let t = tx(50_000_000_000_000_000_000, 1_100_000, TxStatus::Success);
        let finding = flash_loan_pattern(&t).unwrap();
        assert!(finding.score >= 65);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn h2_fires_at_six_not_five() {
        assert!(high_frequency_sender(5).is_none());
        assert!(high_frequency_sender(6).is_some());
    }

    #[test]
    fn h3_fires_at_eleven_not_ten() {
        assert!(ddos_on_contract(10).is_none());
        assert!(ddos_on_contract(11).is_some());
    }

    #[test]
    fn h4_high_value_transfer_scenario_s1() {
        let t = tx(11_000_000_000_000_000_000, 100_000, TxStatus::Success);
        let finding = high_value_transfer(&t).expect("S1 should fire H4");
        assert_eq!(finding.score, 40);
        assert_eq!(finding.severity, Severity::Medium);
        assert!(finding.label.starts_with("High value transfer"));
    }

    #[test]
    fn h4_fires_one_wei_past_the_threshold() {
        // Exactly at 10 ETH must not fire ("value > 10 ETH"); one wei past
        // it must, which an f64 comparison at this magnitude cannot tell
        // apart from the boundary itself.
        let at_threshold = tx(10_000_000_000_000_000_000, 21_000, TxStatus::Success);
        assert!(high_value_transfer(&at_threshold).is_none());

        let past_threshold = tx(10_000_000_000_000_000_001, 21_000, TxStatus::Success);
        assert!(high_value_transfer(&past_threshold).is_some());
    }

    #[test]
    fn h5_failed_high_gas_scenario_s3() {
        let t = tx(0, 250_000, TxStatus::Failed);
        let finding = failed_high_gas(&t).expect("S3 should fire H5");
        assert_eq!(finding.score, 25);
        assert_eq!(finding.severity, Severity::Low);
        // The 300k gas threshold in H1 is not met, so H1 must stay silent.
        assert!(flash_loan_pattern(&t).is_none());
    }

    #[test]
    fn h6_spam_state_bloat_scenario_s2() {
        let t = tx(0, 1_200_000, TxStatus::Success);
        let finding = spam_state_bloat(&t).expect("S2 should fire H6");
        assert_eq!(finding.score, 65);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn h6_does_not_fire_on_nonzero_value() {
        let t = tx(1, 1_200_000, TxStatus::Success);
        assert!(spam_state_bloat(&t).is_none());
    }

    #[test]
    fn h7_governance_attack_scenario_s5() {
        let t = tx(50_000_000_000_000_000_000, 1_100_000, TxStatus::Success);
        let finding = governance_attack(&t).expect("S5 should fire H7");
        assert_eq!(finding.score, 85);
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn h8_fires_only_when_to_is_absent() {
        let mut t = tx(0, 21_000, TxStatus::Success);
        assert!(contract_deployment(&t).is_none());
        t.to = None;
        let finding = contract_deployment(&t).expect("deployment should fire");
        assert_eq!(finding.score, 0);
        assert_eq!(finding.severity, Severity::Info);
    }
}
