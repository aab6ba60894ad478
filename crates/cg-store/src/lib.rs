//! # Persistent Store (Postgres Adapter)
//!
//! Concrete [`shared_types::store::Store`] implementation backed by
//! Postgres via `sqlx`. Kept as its own crate so every domain crate
//! (`cg-01-risk-engine`, `cg-02-baseline`, `cg-03-validation-queue`,
//! `cg-05-ingester`, `cg-06-supervisor`) depends only on the `Store` trait
//! and stays unit-testable against an in-memory fake.

mod pg_store;
mod schema;

pub use pg_store::PgStore;
