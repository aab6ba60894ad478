//! `alloy`-backed [`ChainEventSource`] adapter (§4.2, §6): a read-only WS
//! subscription for new block numbers plus HTTP calls for block and
//! receipt fetches. The signing side (schema registration, event
//! emission) lives in `cg-04-publisher::AlloyChainPublisher` — this type
//! only ever watches and reads.

use alloy::eips::BlockNumberOrTag;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::BlockTransactionsKind;
use async_trait::async_trait;
use cg_05_ingester::{ChainBlock, ChainError, ChainEventSource, ChainReceipt, ChainTx};
use futures::stream::{BoxStream, StreamExt};
use shared_types::entities::{Address, BigUint, TxHash, TxStatus};
use std::str::FromStr;

pub struct AlloyChainEventSource {
    rpc_url: String,
    ws_url: String,
}

impl AlloyChainEventSource {
    #[must_use]
    pub fn new(rpc_url: String, ws_url: String) -> Self {
        Self { rpc_url, ws_url }
    }

    async fn rpc_provider(&self) -> Result<impl Provider, ChainError> {
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| ChainError::BlockFetch(self.rpc_url.clone(), format!("invalid rpc url: {e}")))?;
        Ok(ProviderBuilder::new().on_http(url))
    }
}

#[async_trait]
impl ChainEventSource for AlloyChainEventSource {
    async fn watch_blocks(&self) -> Result<BoxStream<'static, Result<BigUint, ChainError>>, ChainError> {
        let connect = WsConnect::new(&self.ws_url);
        let provider = ProviderBuilder::new()
            .on_ws(connect)
            .await
            .map_err(|e| ChainError::Subscription(e.to_string()))?;

        let subscription = provider
            .subscribe_blocks()
            .await
            .map_err(|e| ChainError::Subscription(e.to_string()))?;

        let stream = subscription
            .into_stream()
            .map(|header| Ok(BigUint::from_u64(header.number)));
        Ok(Box::pin(stream))
    }

    async fn get_block_with_transactions(&self, number: &BigUint) -> Result<ChainBlock, ChainError> {
        let provider = self.rpc_provider().await?;
        // Block numbers fit comfortably in 64 bits for the foreseeable
        // lifetime of any EVM-compatible chain; `low_u64` truncates
        // rather than panicking if that ever stops being true.
        let n = number.as_u256().low_u64();

        let block = provider
            .get_block_by_number(BlockNumberOrTag::Number(n), BlockTransactionsKind::Full)
            .await
            .map_err(|e| ChainError::BlockFetch(n.to_string(), e.to_string()))?
            .ok_or_else(|| ChainError::BlockFetch(n.to_string(), "block not found".to_string()))?;

        let transactions = block
            .transactions
            .as_transactions()
            .map(|txs| {
                txs.iter()
                    .map(|tx| ChainTx {
                        hash: TxHash::from(tx.hash().to_string().as_str()),
                        from: Address::from(tx.from().to_string().as_str()),
                        to: tx.to().map(|a| Address::from(a.to_string().as_str())),
                        value: BigUint::from_str(&tx.value().to_string()).unwrap_or_else(|_| BigUint::zero()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChainBlock {
            number: number.clone(),
            timestamp: block.header.timestamp as i64,
            transactions,
        })
    }

    async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<ChainReceipt>, ChainError> {
        let provider = self.rpc_provider().await?;
        let parsed = hash
            .as_str()
            .parse()
            .map_err(|e| ChainError::ReceiptFetch(hash.to_string(), format!("invalid hash: {e}")))?;

        let receipt = provider
            .get_transaction_receipt(parsed)
            .await
            .map_err(|e| ChainError::ReceiptFetch(hash.to_string(), e.to_string()))?;

        Ok(receipt.map(|r| ChainReceipt {
            gas_used: r.gas_used as u64,
            status: if r.status() {
                TxStatus::Success
            } else {
                TxStatus::Failed
            },
        }))
    }
}
