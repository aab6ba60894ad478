//! Concrete adapters for the ports the domain crates define: `alloy` for
//! the chain event source and publisher, `reqwest` for the explorer-style
//! history endpoint, and an optional Redis relay for the push channel
//! (§6, §9).

mod chain_alloy;
mod history_http;
mod redis_relay;

pub use chain_alloy::AlloyChainEventSource;
pub use history_http::ReqwestHistorySource;
pub use redis_relay::RedisRelay;
