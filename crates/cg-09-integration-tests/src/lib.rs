//! # Cross-Crate Flow Tests (C9)
//!
//! Nothing in this crate ships; it exists to exercise scenarios that
//! need more than one of the `cg-0*` crates wired together — the
//! pipeline's publish-threshold gating, the dedup/idempotence laws, the
//! finding -> validation queue -> alert round trip, and a supervised
//! ingester's bring-up failure path.

mod fakes;
mod flows;
