//! # Store Error Types
//!
//! Errors surfaced by the persistent store port ([`crate::store::Store`]).
//! Concrete storage adapters (e.g. the Postgres implementation in
//! `cg-store`) map their native errors onto this taxonomy; domain crates
//! never see a driver-specific error type.

use thiserror::Error;

/// Errors that can occur against the persistent store.
///
/// Maps onto the "Store" kind of the error taxonomy: write-conflict /
/// serialization failure gets a single retry with jitter by the caller;
/// every other variant is surfaced and logged without corrupting counters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serializable-isolation write conflict; caller should retry once
    /// with jitter before surfacing.
    #[error("write conflict, retry")]
    WriteConflict,

    /// No row matched the lookup key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique-key violation on `Transaction.hash` or `Contract.address`
    /// that the caller should treat as a no-op, not an error.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Any other storage-layer failure (connection, timeout, etc.).
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict)
    }
}
