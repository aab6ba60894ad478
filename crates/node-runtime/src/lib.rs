//! Process entry point: configuration, adapter wiring, and graceful
//! shutdown for the ChainGuard monitoring node.

pub mod adapters;
pub mod config;
pub mod wiring;
