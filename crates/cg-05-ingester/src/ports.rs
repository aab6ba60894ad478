//! Chain-event and history ports (§4.2, §6).
//!
//! Modeled as traits so the ingestion state machine is unit-testable
//! against fakes; the concrete adapters ride on `alloy` (block watcher,
//! receipts) and `reqwest` (explorer-style history HTTP endpoint).

use async_trait::async_trait;
use futures::stream::BoxStream;
use shared_types::entities::{Address, BigUint, TxHash, TxStatus};
use thiserror::Error;

/// A transaction as it appears inside a fetched block, before its
/// receipt is known.
#[derive(Debug, Clone)]
pub struct ChainTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub value: BigUint,
}

/// A fetched block with its full transaction list (§4.2 "fetch the block
/// with full transactions").
#[derive(Debug, Clone)]
pub struct ChainBlock {
    pub number: BigUint,
    pub timestamp: i64,
    pub transactions: Vec<ChainTx>,
}

/// The receipt fields the engine needs (§4.2 "fetch the receipt to
/// obtain gasUsed and status").
#[derive(Debug, Clone)]
pub struct ChainReceipt {
    pub gas_used: u64,
    pub status: TxStatus,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("block watcher subscription failed: {0}")]
    Subscription(String),
    #[error("failed to fetch block {0}: {1}")]
    BlockFetch(String, String),
    #[error("failed to fetch receipt for {0}: {1}")]
    ReceiptFetch(String, String),
}

/// New-block subscription plus the fetch calls the watcher path needs
/// (§4.2 "Primary - block watcher", §6 "Chain event source").
#[async_trait]
pub trait ChainEventSource: Send + Sync {
    /// A fallible stream of newly mined block numbers; an `Err` item is
    /// the watcher's error callback (§4.2), after which the ingester
    /// switches to polling fallback.
    async fn watch_blocks(&self) -> Result<BoxStream<'static, Result<BigUint, ChainError>>, ChainError>;

    async fn get_block_with_transactions(&self, number: &BigUint) -> Result<ChainBlock, ChainError>;

    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<ChainReceipt>, ChainError>;
}

/// A row from the explorer-style `txlist` endpoint (§6 exact shape).
#[derive(Debug, Clone)]
pub struct HistoryTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub value: BigUint,
    pub gas_used: u64,
    pub is_error: bool,
    pub timestamp: i64,
    pub block_number: BigUint,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history endpoint request failed: {0}")]
    Transport(String),
    #[error("history endpoint returned malformed data: {0}")]
    Malformed(String),
}

/// Used for both backfill and the polling fallback (§4.2, §6 "History
/// source").
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn list_transactions(
        &self,
        address: &Address,
        start_block: &BigUint,
    ) -> Result<Vec<HistoryTx>, HistoryError>;
}
