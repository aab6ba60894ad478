//! # Shared Types Crate
//!
//! Contains every entity in the monitoring engine's data model (User,
//! Contract, Transaction, Finding, Alert, `FailedMonitor`,
//! `FunctionGasProfile`) plus the [`store::Store`] port that all domain
//! crates program against.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Lowercase addresses everywhere**: [`entities::Address`] and
//!   [`entities::TxHash`] normalize on construction; nothing downstream
//!   needs to re-normalize.
//! - **Arbitrary-precision wei**: [`entities::BigUint`] is used for every
//!   on-chain value and block height; never downcast to `f64` for
//!   persisted arithmetic.

pub mod entities;
pub mod errors;
pub mod store;

pub use entities::*;
pub use errors::*;
