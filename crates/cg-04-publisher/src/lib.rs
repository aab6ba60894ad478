//! # Publisher (C4)
//!
//! Emits two typed on-chain records so other applications can subscribe
//! to the feed (§4.5): `SecurityAlert` for every finding, and `RiskScore`
//! only once the composite score clears [`publisher::RISK_SCORE_PUBLISH_THRESHOLD`].
//! Requires a signing key; its absence disables publication without
//! affecting ingestion (§4.5, §6).

mod alloy_publisher;
mod chain;
mod payload;
mod publisher;

pub use alloy_publisher::{AlloyChainPublisher, AlloyPublisherConfig};
pub use chain::{ChainEvent, ChainPublisher, FieldDef, PublishError, SchemaDefinition, SchemaId};
pub use payload::{
    decode_risk_score, decode_security_alert, encode, risk_score_fields, security_alert_fields,
    RiskScorePayload, SecurityAlertPayload,
};
pub use publisher::{AlertPublisher, PublishOutcome, Publisher, RISK_SCORE_PUBLISH_THRESHOLD};
