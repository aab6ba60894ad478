//! Layer stack for the operational HTTP surface (§6): CORS, request
//! tracing and a blanket timeout, applied over every route in
//! [`crate::router::build_router`].

mod cors;

pub use cors::create_cors_layer;

use std::time::Duration;

/// Default budget for an operational route: these handlers only read
/// in-memory state, so anything past this indicates a stuck lock.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
