//! Postgres implementation of the [`Store`] port.
//!
//! Follows the raw-`sqlx::query`/`Row::get` style used throughout the
//! pack's settlement adapters rather than the compile-time-checked `query!`
//! macro family, since query-macro verification requires a live database
//! connection at build time.

use async_trait::async_trait;
use rand::Rng;
use shared_types::entities::{
    Address, Alert, BigUint, Contract, ContractStatus, FailedMonitor, Finding, FunctionGasProfile,
    Network, Transaction, TxHash, TxStatus,
};
use shared_types::errors::StoreError;
use shared_types::store::{BaselineUpdate, RecordOutcome, Store};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::str::FromStr;
use tracing::warn;

/// Postgres error code for a serialization failure under
/// `SERIALIZABLE` isolation (§5, invariant 4).
const SERIALIZATION_FAILURE: &str = "40001";
/// Postgres error code for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        crate::schema::ensure_schema(&pool)
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_sqlx_err(err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == SERIALIZATION_FAILURE {
                    return StoreError::WriteConflict;
                }
                if code == UNIQUE_VIOLATION {
                    return StoreError::Duplicate(db_err.message().to_string());
                }
            }
        }
        StoreError::Other(err.to_string())
    }
}

fn contract_from_row(row: &sqlx::postgres::PgRow) -> Result<Contract, StoreError> {
    let network_str: String = row.get("network");
    let status_str: String = row.get("status");
    let last_processed_block: String = row.get("last_processed_block");
    let baseline_value: String = row.get("baseline_value");
    let baseline_value_std_dev: String = row.get("baseline_value_std_dev");

    Ok(Contract {
        id: row.get("id"),
        address: Address::from(row.get::<String, _>("address")),
        name: row.get("name"),
        network: parse_network(&network_str)?,
        status: parse_status(&status_str)?,
        status_message: row.get("status_message"),
        owner_id: row.get("owner_id"),
        total_txs: row.get::<i64, _>("total_txs") as u64,
        failed_txs: row.get::<i64, _>("failed_txs") as u64,
        avg_gas: row.get::<i64, _>("avg_gas") as u64,
        last_processed_block: BigUint::from_str(&last_processed_block)
            .map_err(|e| StoreError::Other(e.to_string()))?,
        baseline_gas: row.get::<i64, _>("baseline_gas") as u64,
        baseline_gas_std_dev: row.get::<i64, _>("baseline_gas_std_dev") as u64,
        baseline_tx_frequency: row.get("baseline_tx_frequency"),
        baseline_value: BigUint::from_str(&baseline_value)
            .map_err(|e| StoreError::Other(e.to_string()))?,
        baseline_value_std_dev: BigUint::from_str(&baseline_value_std_dev)
            .map_err(|e| StoreError::Other(e.to_string()))?,
        baseline_last_updated: row.get("baseline_last_updated"),
        last_activity: row.get("last_activity"),
        created_at: row.get("created_at"),
    })
}

fn transaction_from_row(row: &sqlx::postgres::PgRow) -> Result<Transaction, StoreError> {
    let value: String = row.get("value");
    let block_number: String = row.get("block_number");
    let status_str: String = row.get("status");
    let to_address: Option<String> = row.get("to_address");

    Ok(Transaction {
        id: row.get("id"),
        hash: TxHash::from(row.get::<String, _>("hash").as_str()),
        from: Address::from(row.get::<String, _>("from_address")),
        to: to_address.map(Address::from),
        value: BigUint::from_str(&value).map_err(|e| StoreError::Other(e.to_string()))?,
        gas_used: row.get::<i64, _>("gas_used") as u64,
        status: parse_tx_status(&status_str)?,
        block_number: BigUint::from_str(&block_number)
            .map_err(|e| StoreError::Other(e.to_string()))?,
        timestamp: row.get("timestamp"),
        contract_address: Address::from(row.get::<String, _>("contract_address")),
    })
}

fn parse_network(s: &str) -> Result<Network, StoreError> {
    match s {
        "testnet" => Ok(Network::Testnet),
        "mainnet" => Ok(Network::Mainnet),
        other => Err(StoreError::Other(format!("unknown network: {other}"))),
    }
}

fn parse_status(s: &str) -> Result<ContractStatus, StoreError> {
    match s {
        "pending" => Ok(ContractStatus::Pending),
        "analyzing" => Ok(ContractStatus::Analyzing),
        "healthy" => Ok(ContractStatus::Healthy),
        "warning" => Ok(ContractStatus::Warning),
        "critical" => Ok(ContractStatus::Critical),
        "error" => Ok(ContractStatus::Error),
        "stopped" => Ok(ContractStatus::Stopped),
        other => Err(StoreError::Other(format!("unknown contract status: {other}"))),
    }
}

fn parse_tx_status(s: &str) -> Result<TxStatus, StoreError> {
    match s {
        "success" => Ok(TxStatus::Success),
        "failed" => Ok(TxStatus::Failed),
        other => Err(StoreError::Other(format!("unknown tx status: {other}"))),
    }
}

fn status_str(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::Pending => "pending",
        ContractStatus::Analyzing => "analyzing",
        ContractStatus::Healthy => "healthy",
        ContractStatus::Warning => "warning",
        ContractStatus::Critical => "critical",
        ContractStatus::Error => "error",
        ContractStatus::Stopped => "stopped",
    }
}

#[async_trait]
impl Store for PgStore {
    async fn record_transaction(&self, tx: &Transaction) -> Result<RecordOutcome, StoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut txn = self.pool.begin().await.map_err(Self::map_sqlx_err)?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *txn)
                .await
                .map_err(Self::map_sqlx_err)?;

            let existing = sqlx::query("SELECT 1 FROM transactions WHERE hash = $1")
                .bind(tx.hash.as_str())
                .fetch_optional(&mut *txn)
                .await
                .map_err(Self::map_sqlx_err)?;

            if existing.is_some() {
                txn.commit().await.map_err(Self::map_sqlx_err)?;
                return Ok(RecordOutcome::Duplicate);
            }

            let insert_result = sqlx::query(
                "INSERT INTO transactions
                 (id, hash, from_address, to_address, value, gas_used, status, block_number, timestamp, contract_address)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(&tx.id)
            .bind(tx.hash.as_str())
            .bind(tx.from.as_str())
            .bind(tx.to.as_ref().map(Address::as_str))
            .bind(tx.value.to_decimal_string())
            .bind(tx.gas_used as i64)
            .bind(match tx.status {
                TxStatus::Success => "success",
                TxStatus::Failed => "failed",
            })
            .bind(tx.block_number.to_decimal_string())
            .bind(tx.timestamp)
            .bind(tx.contract_address.as_str())
            .execute(&mut *txn)
            .await;

            if let Err(e) = insert_result {
                let mapped = Self::map_sqlx_err(e);
                if matches!(mapped, StoreError::Duplicate(_)) {
                    txn.rollback().await.ok();
                    return Ok(RecordOutcome::Duplicate);
                }
                return Err(mapped);
            }

            let failed_increment = i64::from(matches!(tx.status, TxStatus::Failed));
            let update_result = sqlx::query(
                "UPDATE contracts SET
                    total_txs = total_txs + 1,
                    failed_txs = failed_txs + $1,
                    avg_gas = (avg_gas * total_txs + $2 + (total_txs + 1) / 2) / (total_txs + 1),
                    last_processed_block = $3,
                    last_activity = $4
                 WHERE address = $5",
            )
            .bind(failed_increment)
            .bind(tx.gas_used as i64)
            .bind(tx.block_number.to_decimal_string())
            .bind(tx.timestamp)
            .bind(tx.contract_address.as_str())
            .execute(&mut *txn)
            .await;

            if let Err(e) = update_result {
                return Err(Self::map_sqlx_err(e));
            }

            match txn.commit().await {
                Ok(()) => return Ok(RecordOutcome::Inserted),
                Err(e) => {
                    let mapped = Self::map_sqlx_err(e);
                    if mapped.is_write_conflict() && attempt < 2 {
                        let jitter_ms = rand::thread_rng().gen_range(100..=300);
                        warn!(tx = %tx.hash, attempt, jitter_ms, "serializable write conflict, retrying");
                        tokio::time::sleep(std::time::Duration::from_millis(jitter_ms)).await;
                        continue;
                    }
                    return Err(mapped);
                }
            }
        }
    }

    async fn get_contract(&self, address: &Address) -> Result<Option<Contract>, StoreError> {
        let row = sqlx::query("SELECT * FROM contracts WHERE address = $1")
            .bind(address.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;

        row.as_ref().map(contract_from_row).transpose()
    }

    async fn list_monitored_contracts(&self) -> Result<Vec<Contract>, StoreError> {
        let rows = sqlx::query("SELECT * FROM contracts WHERE status != 'stopped'")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;

        rows.iter().map(contract_from_row).collect()
    }

    async fn update_contract_status(
        &self,
        address: &Address,
        status: ContractStatus,
        message: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE contracts SET status = $1, status_message = $2 WHERE address = $3",
        )
        .bind(status_str(status))
        .bind(message)
        .bind(address.as_str())
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(address.to_string()));
        }
        Ok(())
    }

    async fn insert_finding(&self, finding: &Finding) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO findings
             (id, contract_address, type, severity, rule_confidence, function_name, line, code_snippet, description, validated, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&finding.id)
        .bind(finding.contract_address.as_str())
        .bind(&finding.r#type)
        .bind(finding.severity.to_string())
        .bind(finding.rule_confidence)
        .bind(&finding.function_name)
        .bind(finding.line.map(|v| v as i32))
        .bind(&finding.code_snippet)
        .bind(&finding.description)
        .bind(finding.validated)
        .bind(finding.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn mark_finding_validated(&self, finding_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE findings SET validated = TRUE WHERE id = $1")
            .bind(finding_id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(finding_id.to_string()));
        }
        Ok(())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO alerts
             (id, contract_address, type, severity, description, recommendation, dismissed, llm_valid, llm_confidence, llm_reason, llm_context, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&alert.id)
        .bind(alert.contract_address.as_str())
        .bind(&alert.r#type)
        .bind(alert.severity.to_string())
        .bind(&alert.description)
        .bind(&alert.recommendation)
        .bind(alert.dismissed)
        .bind(alert.llm_valid)
        .bind(alert.llm_confidence)
        .bind(&alert.llm_reason)
        .bind(&alert.llm_context)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE alerts SET
                description = $1, recommendation = $2, dismissed = $3,
                llm_valid = $4, llm_confidence = $5, llm_reason = $6, llm_context = $7
             WHERE id = $8",
        )
        .bind(&alert.description)
        .bind(&alert.recommendation)
        .bind(alert.dismissed)
        .bind(alert.llm_valid)
        .bind(alert.llm_confidence)
        .bind(&alert.llm_reason)
        .bind(&alert.llm_context)
        .bind(&alert.id)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(alert.id.clone()));
        }
        Ok(())
    }

    async fn delete_alert(&self, alert_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM alerts WHERE id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn insert_failed_monitor(&self, failed: &FailedMonitor) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO failed_monitors
             (id, contract_address, network, reason, attempts, last_attempt, resolved)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&failed.id)
        .bind(failed.contract_address.as_str())
        .bind(failed.network.to_string())
        .bind(&failed.reason)
        .bind(failed.attempts as i32)
        .bind(failed.last_attempt)
        .bind(failed.resolved)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn recent_successful_transactions(
        &self,
        address: &Address,
        since: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM transactions
             WHERE contract_address = $1 AND status = 'success' AND timestamp >= $2
             ORDER BY timestamp ASC",
        )
        .bind(address.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn update_baseline(
        &self,
        address: &Address,
        update: BaselineUpdate,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE contracts SET
                baseline_gas = $1,
                baseline_gas_std_dev = $2,
                baseline_value = $3,
                baseline_value_std_dev = $4,
                baseline_tx_frequency = $5,
                baseline_last_updated = $6
             WHERE address = $7",
        )
        .bind(update.avg_gas as i64)
        .bind(update.gas_std_dev as i64)
        .bind(update.avg_value.to_decimal_string())
        .bind(update.value_std_dev.to_decimal_string())
        .bind(update.tx_frequency)
        .bind(update.updated_at)
        .bind(address.as_str())
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(address.to_string()));
        }
        Ok(())
    }

    async fn upsert_function_gas_profile(
        &self,
        profile: &FunctionGasProfile,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO function_gas_profiles
             (contract_address, function_selector, function_name, avg_gas, min_gas, max_gas, std_dev_gas, call_count, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (contract_address, function_selector) DO UPDATE SET
                function_name = EXCLUDED.function_name,
                avg_gas = EXCLUDED.avg_gas,
                min_gas = EXCLUDED.min_gas,
                max_gas = EXCLUDED.max_gas,
                std_dev_gas = EXCLUDED.std_dev_gas,
                call_count = EXCLUDED.call_count,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(profile.contract_address.as_str())
        .bind(&profile.function_selector)
        .bind(&profile.function_name)
        .bind(profile.avg_gas as i64)
        .bind(profile.min_gas as i64)
        .bind(profile.max_gas as i64)
        .bind(profile.std_dev_gas as i64)
        .bind(profile.call_count as i64)
        .bind(profile.last_updated)
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;
        Ok(())
    }
}
