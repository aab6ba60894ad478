//! Schema bootstrap. Executed once at startup instead of via an embedded
//! migration runner, since the monitoring engine owns its whole schema and
//! has no migration history to replay (§6).

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS contracts (
        id                       TEXT PRIMARY KEY,
        address                  TEXT NOT NULL UNIQUE,
        name                     TEXT,
        network                  TEXT NOT NULL,
        status                   TEXT NOT NULL,
        status_message           TEXT,
        owner_id                 TEXT,
        total_txs                BIGINT NOT NULL DEFAULT 0,
        failed_txs               BIGINT NOT NULL DEFAULT 0,
        avg_gas                  BIGINT NOT NULL DEFAULT 0,
        last_processed_block     TEXT NOT NULL DEFAULT '0',
        baseline_gas             BIGINT NOT NULL DEFAULT 0,
        baseline_gas_std_dev     BIGINT NOT NULL DEFAULT 0,
        baseline_tx_frequency    DOUBLE PRECISION NOT NULL DEFAULT 0,
        baseline_value           TEXT NOT NULL DEFAULT '0',
        baseline_value_std_dev   TEXT NOT NULL DEFAULT '0',
        baseline_last_updated    BIGINT,
        last_activity            BIGINT,
        created_at               BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS transactions (
        id                TEXT PRIMARY KEY,
        hash              TEXT NOT NULL UNIQUE,
        from_address      TEXT NOT NULL,
        to_address        TEXT,
        value             TEXT NOT NULL,
        gas_used          BIGINT NOT NULL,
        status            TEXT NOT NULL,
        block_number      TEXT NOT NULL,
        timestamp         BIGINT NOT NULL,
        contract_address  TEXT NOT NULL REFERENCES contracts(address)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_contract_ts ON transactions(contract_address, timestamp)",
    r#"CREATE TABLE IF NOT EXISTS findings (
        id                TEXT PRIMARY KEY,
        contract_address  TEXT NOT NULL REFERENCES contracts(address),
        type              TEXT NOT NULL,
        severity          TEXT NOT NULL,
        rule_confidence   DOUBLE PRECISION NOT NULL,
        function_name     TEXT,
        line              INTEGER,
        code_snippet      TEXT,
        description       TEXT NOT NULL,
        validated         BOOLEAN NOT NULL DEFAULT FALSE,
        created_at        BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS alerts (
        id                TEXT PRIMARY KEY,
        contract_address  TEXT NOT NULL REFERENCES contracts(address),
        type              TEXT NOT NULL,
        severity          TEXT NOT NULL,
        description       TEXT NOT NULL,
        recommendation    TEXT,
        dismissed         BOOLEAN NOT NULL DEFAULT FALSE,
        llm_valid         BOOLEAN,
        llm_confidence    DOUBLE PRECISION,
        llm_reason        TEXT,
        llm_context       TEXT,
        created_at        BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS failed_monitors (
        id                TEXT PRIMARY KEY,
        contract_address  TEXT NOT NULL,
        network           TEXT NOT NULL,
        reason            TEXT NOT NULL,
        attempts          INTEGER NOT NULL,
        last_attempt      BIGINT NOT NULL,
        resolved          BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS function_gas_profiles (
        contract_address  TEXT NOT NULL,
        function_selector TEXT NOT NULL,
        function_name     TEXT,
        avg_gas           BIGINT NOT NULL,
        min_gas           BIGINT NOT NULL,
        max_gas           BIGINT NOT NULL,
        std_dev_gas       BIGINT NOT NULL,
        call_count        BIGINT NOT NULL,
        last_updated      BIGINT NOT NULL,
        PRIMARY KEY (contract_address, function_selector)
    )"#,
];

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
