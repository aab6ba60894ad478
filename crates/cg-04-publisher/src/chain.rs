//! The chain-side publication port (§4.5, §6).
//!
//! Deliberately narrow: the core only ever needs to register a schema
//! once and submit "emit event + store data" transactions afterwards, not
//! the chain SDK's general-purpose surface (§1 non-goals, SPEC_FULL §6).
//! The concrete adapter in [`crate::alloy_publisher`] rides on `alloy`;
//! this trait keeps the rest of the crate signer-agnostic and lets tests
//! swap in a fake.

use async_trait::async_trait;
use thiserror::Error;

/// Opaque schema identifier returned by registration. `None` means
/// registration never succeeded (or was never attempted); publish
/// attempts against an unset schema id are skipped, not retried (§4.5,
/// §9 "Schema registration failure is non-fatal").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(pub [u8; 32]);

/// A field in a schema definition, in on-chain declaration order.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: &'static str,
}

#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub name: &'static str,
    pub fields: Vec<FieldDef>,
}

/// One "emit event + store data" submission (§6): `data` is opaque bytes
/// stored under `(schema_id, publisher, data_id)`; `topics` are indexed
/// 32-byte words attached to the emitted log.
#[derive(Debug, Clone)]
pub struct ChainEvent {
    pub schema_id: SchemaId,
    pub data_id: [u8; 32],
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("schema registration transaction failed: {0}")]
    SchemaRegistration(String),
    #[error("event emission transaction failed: {0}")]
    EventEmission(String),
    #[error("no signing key configured, publishing is disabled")]
    NoSigningKey,
}

/// Chain-side capabilities the publisher needs (§6 "Chain event source").
#[async_trait]
pub trait ChainPublisher: Send + Sync {
    /// Registers a schema if not already present and returns its id.
    /// Idempotent: re-registering an existing schema returns the same id.
    async fn register_schema(&self, schema: &SchemaDefinition) -> Result<SchemaId, PublishError>;

    /// Submits one "emit event + store data" transaction.
    async fn submit_event(&self, event: ChainEvent) -> Result<(), PublishError>;

    /// Whether a signing key is configured; when `false`, publish calls
    /// are skipped entirely rather than attempted and failed (§4.5, §6
    /// `TESTNET_PRIVATE_KEY` optional; absence disables on-chain
    /// publishing).
    fn signing_key_configured(&self) -> bool;
}
