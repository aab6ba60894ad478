//! # Risk Engine (C2)
//!
//! Pure, synchronous scoring of a single transaction against eight
//! behavioral heuristics. No I/O, no async, no side effects: the caller
//! owns persistence, event emission, and validation enqueueing.
//!
//! The composite score is the **maximum** of whichever heuristics fire,
//! not a sum — a transaction that trips both the flash-loan pattern and
//! the governance-attack heuristic is exactly as risky as the worse of
//! the two, not risk-stacked.

mod frequency;
mod heuristics;
mod types;

pub use frequency::{FrequencyTracker, MAX_TRACKED_KEYS, WINDOW_SECONDS};
pub use types::{HeuristicFinding, RiskAssessment, RiskLevel, TxView};

/// Scores `tx` against all eight heuristics, consulting and updating
/// `freq` for the two frequency-based ones (H2, H3).
///
/// Deterministic: the same `(tx, freq-state-before-this-call)` pair
/// always yields the same [`RiskAssessment`] (invariant 1, §8).
pub fn evaluate(tx: &TxView, freq: &mut FrequencyTracker, now: i64) -> RiskAssessment {
    let sender_count = freq.record(&tx.from, now);
    let contract_count = match &tx.to {
        Some(to) => freq.record(to, now),
        None => 0,
    };

    let mut findings = Vec::new();
    findings.extend(heuristics::flash_loan_pattern(tx));
    findings.extend(heuristics::high_frequency_sender(sender_count));
    findings.extend(heuristics::ddos_on_contract(contract_count));
    findings.extend(heuristics::high_value_transfer(tx));
    findings.extend(heuristics::failed_high_gas(tx));
    findings.extend(heuristics::spam_state_bloat(tx));
    findings.extend(heuristics::governance_attack(tx));
    findings.extend(heuristics::contract_deployment(tx));

    let winner = findings.iter().max_by_key(|f| f.score);
    let risk_score = winner.map(|f| f.score).unwrap_or(0);
    let primary_factor = winner.map(|f| f.label.to_string()).unwrap_or_else(|| "none".to_string());

    RiskAssessment {
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        primary_factor,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{Address, BigUint, Network, TxHash, TxStatus};

    fn tx(from: &str, to: &str, value_wei: u128, gas_used: u64, status: TxStatus) -> TxView {
        TxView {
            hash: TxHash::from("0xaaaa"),
            from: Address::from(from),
            to: Some(Address::from(to)),
            value: BigUint::from_u128(value_wei),
            gas_used,
            status,
            network: Network::Testnet,
        }
    }

    #[test]
    fn s1_high_value_transfer() {
        let mut freq = FrequencyTracker::new();
        let t = tx(
            "0xaaaa_from",
            "0xcccc_to",
            11_000_000_000_000_000_000,
            100_000,
            TxStatus::Success,
        );
        let result = evaluate(&t, &mut freq, 0);
        assert_eq!(result.risk_score, 40);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.primary_factor.starts_with("High value transfer"));
        assert!(result.findings.iter().any(|f| f.r#type == "SUSPICIOUS_ACTIVITY"));
    }

    #[test]
    fn s2_spam_state_bloat() {
        let mut freq = FrequencyTracker::new();
        let t = tx("0xa", "0xc", 0, 1_200_000, TxStatus::Success);
        let result = evaluate(&t, &mut freq, 0);
        assert_eq!(result.risk_score, 65);
        assert!(result.findings.iter().any(|f| f.r#type == "SPAM_ATTACK"));
    }

    #[test]
    fn s3_failed_high_gas_only() {
        let mut freq = FrequencyTracker::new();
        let t = tx("0xa", "0xc", 0, 250_000, TxStatus::Failed);
        let result = evaluate(&t, &mut freq, 0);
        assert_eq!(result.risk_score, 25);
        assert_eq!(result.risk_level, RiskLevel::Low);
        // Below 30, so the caller must not publish a RiskScore event.
        assert!(result.risk_score < 30);
    }

    #[test]
    fn s4_high_frequency_sender_fires_on_sixth() {
        let mut freq = FrequencyTracker::new();
        let mut last = None;
        for i in 0..6 {
            let t = tx(
                "0xa_sender",
                "0xc_contract",
                1_000_000_000_000_000_000,
                60_000,
                TxStatus::Success,
            );
            last = Some(evaluate(&t, &mut freq, i * 5));
        }
        let result = last.unwrap();
        assert!(result
            .findings
            .iter()
            .any(|f| f.r#type == "HIGH_FREQUENCY_BOT" && f.score == 45));
    }

    #[test]
    fn s5_flash_loan_composite_picks_max_not_sum() {
        let mut freq = FrequencyTracker::new();
        let t = tx(
            "0xa",
            "0xc",
            50_000_000_000_000_000_000,
            1_100_000,
            TxStatus::Success,
        );
        let result = evaluate(&t, &mut freq, 0);
        // H1 scores 75, H7 scores 85 -- composite must be 85, not 160.
        assert_eq!(result.risk_score, 85);
        assert!(matches!(result.risk_level, RiskLevel::Critical));
    }

    #[test]
    fn risk_level_boundaries_match_spec() {
        assert_eq!(RiskLevel::from_score(9), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(65), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Critical);
    }

    #[test]
    fn no_heuristic_firing_yields_safe_zero() {
        let mut freq = FrequencyTracker::new();
        let t = tx("0xa", "0xc", 0, 21_000, TxStatus::Success);
        let result = evaluate(&t, &mut freq, 0);
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Safe);
        assert_eq!(result.primary_factor, "none");
    }

    #[test]
    fn determinism_same_input_same_output() {
        let mut freq_a = FrequencyTracker::new();
        let mut freq_b = FrequencyTracker::new();
        let t = tx(
            "0xa",
            "0xc",
            11_000_000_000_000_000_000,
            100_000,
            TxStatus::Success,
        );
        let a = evaluate(&t, &mut freq_a, 0);
        let b = evaluate(&t, &mut freq_b, 0);
        assert_eq!(a.risk_score, b.risk_score);
        assert_eq!(a.primary_factor, b.primary_factor);
    }
}
