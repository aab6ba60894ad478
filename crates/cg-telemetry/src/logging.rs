//! Structured logging for Loki integration.
//!
//! Logs are formatted as JSON with consistent fields that Loki can parse:
//! - `timestamp`: ISO 8601 timestamp
//! - `level`: Log level (error, warn, info, debug)
//! - `component`: Component identifier (ingester, risk-engine, supervisor, etc.)
//! - `message`: Log message
//! - `trace_id`: OpenTelemetry trace ID (for correlation with Tempo)
//! - Additional context fields

use crate::{TelemetryConfig, TelemetryError};

/// Structured logger handle
pub struct StructuredLogger {
    _initialized: bool,
}

/// Initialize Loki logging.
///
/// Note: Loki integration is handled via the tracing-subscriber JSON layer.
/// Logs are sent to Loki via a log shipping agent (Promtail) or direct push.
/// This function configures structured logging that's Loki-compatible.
pub fn init_logging(config: &TelemetryConfig) -> Result<StructuredLogger, TelemetryError> {
    tracing::debug!(
        loki_endpoint = %config.loki_endpoint,
        json_logs = config.json_logs,
        "Structured logging configured for Loki compatibility"
    );

    Ok(StructuredLogger { _initialized: true })
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    // Info level with component
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with component
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with component
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with component
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $component:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a contract-related event with standard fields.
#[macro_export]
macro_rules! log_contract_event {
    ($level:ident, $component:expr, $msg:expr, $contract_address:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            contract_address = %$contract_address,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    // Logging tests would require a mock Loki server
    // Better tested in integration tests
}
