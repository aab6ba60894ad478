//! `reqwest`-backed [`HistorySource`] adapter (§4.2, §6): the
//! explorer-style `txlist` endpoint used for both startup backfill and
//! the polling fallback.

use async_trait::async_trait;
use cg_05_ingester::{HistoryError, HistorySource, HistoryTx};
use serde::Deserialize;
use shared_types::entities::{Address, BigUint, TxHash};
use std::str::FromStr;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A single row of the explorer's `txlist` response (§6 exact shape).
/// Etherscan-style explorers serialize every numeric field as a string,
/// so every field here is a string and parsed on the way into
/// [`HistoryTx`].
#[derive(Debug, Deserialize)]
struct TxListRow {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
    #[serde(rename = "gasUsed")]
    gas_used: String,
    #[serde(rename = "isError", default)]
    is_error: String,
    #[serde(rename = "timeStamp")]
    time_stamp: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
}

#[derive(Debug, Deserialize)]
struct TxListResponse {
    status: String,
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

pub struct ReqwestHistorySource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReqwestHistorySource {
    #[must_use]
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout is infallible to build");
        Self { client, base_url, api_key }
    }
}

#[async_trait]
impl HistorySource for ReqwestHistorySource {
    async fn list_transactions(
        &self,
        address: &Address,
        start_block: &BigUint,
    ) -> Result<Vec<HistoryTx>, HistoryError> {
        let mut query = vec![
            ("module", "account".to_string()),
            ("action", "txlist".to_string()),
            ("address", address.as_str().to_string()),
            ("startblock", start_block.to_decimal_string()),
            ("sort", "asc".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| HistoryError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HistoryError::Transport(format!(
                "history endpoint returned status {}",
                response.status()
            )));
        }

        let body: TxListResponse = response
            .json()
            .await
            .map_err(|e| HistoryError::Malformed(e.to_string()))?;

        // Explorers report "no transactions found" as status "0" with a
        // message rather than an empty array; that is not a transport
        // error, just an empty result.
        if body.status == "0" && !body.message.to_lowercase().contains("no transactions") {
            return Err(HistoryError::Transport(body.message));
        }

        let rows: Vec<TxListRow> = match body.result {
            serde_json::Value::Array(_) => {
                serde_json::from_value(body.result).map_err(|e| HistoryError::Malformed(e.to_string()))?
            }
            _ => Vec::new(),
        };

        rows.into_iter().map(row_to_history_tx).collect()
    }
}

fn row_to_history_tx(row: TxListRow) -> Result<HistoryTx, HistoryError> {
    let value = BigUint::from_str(&row.value)
        .map_err(|_| HistoryError::Malformed(format!("invalid value {:?}", row.value)))?;
    let block_number = BigUint::from_str(&row.block_number)
        .map_err(|_| HistoryError::Malformed(format!("invalid blockNumber {:?}", row.block_number)))?;
    let gas_used: u64 = row
        .gas_used
        .parse()
        .map_err(|_| HistoryError::Malformed(format!("invalid gasUsed {:?}", row.gas_used)))?;
    let timestamp: i64 = row
        .time_stamp
        .parse()
        .map_err(|_| HistoryError::Malformed(format!("invalid timeStamp {:?}", row.time_stamp)))?;

    Ok(HistoryTx {
        hash: TxHash::from(row.hash.as_str()),
        from: Address::from(row.from.as_str()),
        to: if row.to.is_empty() { None } else { Some(Address::from(row.to.as_str())) },
        value,
        gas_used,
        is_error: row.is_error == "1",
        timestamp,
        block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_history_tx_parses_etherscan_style_fields() {
        let row = TxListRow {
            hash: "0xABC".into(),
            from: "0xFrom".into(),
            to: "0xTo".into(),
            value: "11000000000000000000".into(),
            gas_used: "100000".into(),
            is_error: "0".into(),
            time_stamp: "1700000000".into(),
            block_number: "123456".into(),
        };
        let tx = row_to_history_tx(row).unwrap();
        assert_eq!(tx.hash.as_str(), "0xabc");
        assert!(!tx.is_error);
        assert_eq!(tx.gas_used, 100_000);
        assert_eq!(tx.value.to_decimal_string(), "11000000000000000000");
    }

    #[test]
    fn row_to_history_tx_treats_absent_to_as_deployment() {
        let row = TxListRow {
            hash: "0xabc".into(),
            from: "0xfrom".into(),
            to: String::new(),
            value: "0".into(),
            gas_used: "21000".into(),
            is_error: "0".into(),
            time_stamp: "0".into(),
            block_number: "1".into(),
        };
        let tx = row_to_history_tx(row).unwrap();
        assert!(tx.to.is_none());
    }

    #[test]
    fn row_to_history_tx_rejects_malformed_value() {
        let row = TxListRow {
            hash: "0xabc".into(),
            from: "0xfrom".into(),
            to: "0xto".into(),
            value: "not-a-number".into(),
            gas_used: "21000".into(),
            is_error: "1".into(),
            time_stamp: "0".into(),
            block_number: "1".into(),
        };
        assert!(matches!(row_to_history_tx(row), Err(HistoryError::Malformed(_))));
    }
}
