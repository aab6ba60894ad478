//! `SecurityAlert` and `RiskScore` payload shapes (§4.5) and their schema
//! encoding.
//!
//! The chain-event-source port stores opaque bytes per §6; this crate's
//! "schema" is therefore realized as ordinary JSON-over-bytes keyed by
//! the registered field order, the same representation `shared-bus` uses
//! for push events. Round-tripping a payload through
//! [`encode`]/[`decode_security_alert`] (resp. `decode_risk_score`)
//! yields the original field values (§8 round-trip law).

use crate::chain::FieldDef;
use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, BigUint, Severity, TxHash};

pub fn security_alert_fields() -> Vec<FieldDef> {
    vec![
        FieldDef { name: "timestamp", ty: "i64" },
        FieldDef { name: "contractAddress", ty: "address" },
        FieldDef { name: "txHash", ty: "bytes32" },
        FieldDef { name: "alertType", ty: "string" },
        FieldDef { name: "severity", ty: "string" },
        FieldDef { name: "description", ty: "string" },
        FieldDef { name: "value", ty: "uint256" },
        FieldDef { name: "gasUsed", ty: "uint64" },
        FieldDef { name: "confidence", ty: "f64" },
    ]
}

pub fn risk_score_fields() -> Vec<FieldDef> {
    vec![
        FieldDef { name: "timestamp", ty: "i64" },
        FieldDef { name: "contractAddress", ty: "address" },
        FieldDef { name: "sender", ty: "address" },
        FieldDef { name: "txHash", ty: "bytes32" },
        FieldDef { name: "riskScore", ty: "uint8" },
        FieldDef { name: "riskLevel", ty: "string" },
        FieldDef { name: "primaryFactor", ty: "string" },
        FieldDef { name: "value", ty: "uint256" },
        FieldDef { name: "gasUsed", ty: "uint64" },
    ]
}

/// Emitted for every finding produced (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAlertPayload {
    pub timestamp: i64,
    pub contract_address: Address,
    pub tx_hash: TxHash,
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
    pub value: BigUint,
    pub gas_used: u64,
    pub confidence: f64,
}

/// Emitted only when the composite risk score is `>= 30` (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScorePayload {
    pub timestamp: i64,
    pub contract_address: Address,
    pub sender: Address,
    pub tx_hash: TxHash,
    pub risk_score: u8,
    pub risk_level: String,
    pub primary_factor: String,
    pub value: BigUint,
    pub gas_used: u64,
}

pub fn encode<T: Serialize>(payload: &T) -> Vec<u8> {
    serde_json::to_vec(payload).expect("payload shapes are always serializable")
}

pub fn decode_security_alert(bytes: &[u8]) -> Result<SecurityAlertPayload, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn decode_risk_score(bytes: &[u8]) -> Result<RiskScorePayload, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_alert_round_trips() {
        let payload = SecurityAlertPayload {
            timestamp: 1_700_000_000,
            contract_address: Address::from("0xabc"),
            tx_hash: TxHash::from("0xdead"),
            alert_type: "SPAM_ATTACK".into(),
            severity: Severity::High,
            description: "spam".into(),
            value: BigUint::from_u64(0),
            gas_used: 1_200_000,
            confidence: 0.8,
        };
        let bytes = encode(&payload);
        let decoded = decode_security_alert(&bytes).unwrap();
        assert_eq!(payload, decoded);
    }

    #[test]
    fn risk_score_round_trips() {
        let payload = RiskScorePayload {
            timestamp: 0,
            contract_address: Address::from("0xabc"),
            sender: Address::from("0xsender"),
            tx_hash: TxHash::from("0xdead"),
            risk_score: 85,
            risk_level: "CRITICAL".into(),
            primary_factor: "Flash loan pattern".into(),
            value: BigUint::from_u128(50_000_000_000_000_000_000u128),
            gas_used: 1_100_000,
        };
        let bytes = encode(&payload);
        let decoded = decode_risk_score(&bytes).unwrap();
        assert_eq!(payload, decoded);
    }

    #[test]
    fn field_lists_match_spec_order() {
        assert_eq!(security_alert_fields().len(), 9);
        assert_eq!(risk_score_fields().len(), 9);
    }
}
