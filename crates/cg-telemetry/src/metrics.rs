//! Prometheus metrics for the ChainGuard monitoring engine.
//!
//! Naming convention: `cg_<component>_<metric>_<unit>`.
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., transactions_ingested_total)
//! - **Gauge**: Value that can go up or down (e.g., monitored_contracts)
//! - **Histogram**: Distribution of values (e.g., risk_evaluation_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INGESTER METRICS (C5)
    // =========================================================================

    /// Total transactions ingested, labeled by network
    pub static ref TRANSACTIONS_INGESTED: CounterVec = CounterVec::new(
        Opts::new("cg_ingester_transactions_ingested_total", "Total transactions ingested per network"),
        &["network"]
    ).expect("metric creation failed");

    /// Transactions deduplicated (already-seen hash)
    pub static ref TRANSACTIONS_DEDUPED: Counter = Counter::new(
        "cg_ingester_transactions_deduped_total",
        "Total transactions skipped as duplicates by hash"
    ).expect("metric creation failed");

    /// Contracts currently on the polling fallback path
    pub static ref CONTRACTS_ON_FALLBACK: Gauge = Gauge::new(
        "cg_ingester_contracts_on_fallback",
        "Number of contracts currently polling instead of watching"
    ).expect("metric creation failed");

    /// Block watcher reconnect attempts
    pub static ref WATCHER_RECONNECTS: CounterVec = CounterVec::new(
        Opts::new("cg_ingester_watcher_reconnects_total", "Block watcher reconnect attempts"),
        &["network", "outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // RISK ENGINE METRICS (C2)
    // =========================================================================

    /// Risk evaluations performed, by outcome (finding/no finding)
    pub static ref RISK_EVALUATIONS: CounterVec = CounterVec::new(
        Opts::new("cg_risk_evaluations_total", "Total risk evaluations run"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Findings produced, labeled by heuristic and severity
    pub static ref FINDINGS_PRODUCED: CounterVec = CounterVec::new(
        Opts::new("cg_risk_findings_total", "Total findings produced by heuristic and severity"),
        &["heuristic", "severity"]
    ).expect("metric creation failed");

    /// Risk evaluation duration
    pub static ref RISK_EVALUATION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cg_risk_evaluation_duration_seconds",
            "Time spent evaluating a transaction against all heuristics"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).unwrap())
    ).expect("metric creation failed");

    // =========================================================================
    // VALIDATION QUEUE METRICS (C3)
    // =========================================================================

    /// Current queue depth
    pub static ref VALIDATION_QUEUE_DEPTH: Gauge = Gauge::new(
        "cg_validation_queue_depth",
        "Number of findings awaiting validation"
    ).expect("metric creation failed");

    /// Validator calls, by outcome
    pub static ref VALIDATOR_CALLS: CounterVec = CounterVec::new(
        Opts::new("cg_validation_validator_calls_total", "Validator HTTP calls by outcome"),
        &["outcome"]  // outcome: valid/invalid/timeout/error/dropped
    ).expect("metric creation failed");

    /// Daily validation budget remaining (currency units)
    pub static ref VALIDATION_BUDGET_REMAINING: Gauge = Gauge::new(
        "cg_validation_daily_budget_remaining",
        "Remaining daily validation budget in currency units"
    ).expect("metric creation failed");

    // =========================================================================
    // PUBLISHER METRICS (C4)
    // =========================================================================

    /// On-chain publish attempts, by outcome
    pub static ref PUBLISH_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("cg_publisher_attempts_total", "On-chain publish attempts by outcome"),
        &["schema", "outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // SUPERVISOR METRICS (C6)
    // =========================================================================

    /// Monitored contracts, by status
    pub static ref MONITORED_CONTRACTS: GaugeVec = GaugeVec::new(
        Opts::new("cg_supervisor_monitored_contracts", "Monitored contracts by status"),
        &["status"]
    ).expect("metric creation failed");

    /// Connected push-channel clients (§6 `/metrics` `clientsCount`)
    pub static ref PUSH_CLIENTS_CONNECTED: Gauge = Gauge::new(
        "cg_supervisor_push_clients_connected",
        "Number of clients currently subscribed to the push channel"
    ).expect("metric creation failed");

    /// This process's `INSTANCE_ID` (§6 `/metrics` `instanceId`), the
    /// standard Prometheus "info" pattern: a gauge fixed at 1, identity
    /// carried entirely in the label.
    pub static ref INSTANCE_INFO: GaugeVec = GaugeVec::new(
        Opts::new("cg_instance_info", "Always 1; instance_id label identifies this process"),
        &["instance_id"]
    ).expect("metric creation failed");

    /// Unix timestamp of the most recent `/metrics` scrape (§6 `/metrics`
    /// `timestamp`).
    pub static ref METRICS_SCRAPE_TIMESTAMP_SECONDS: Gauge = Gauge::new(
        "cg_metrics_scrape_timestamp_seconds",
        "Unix timestamp at which this metrics page was rendered"
    ).expect("metric creation failed");

    /// Contracts abandoned after exhausting their retry budget
    pub static ref MONITORING_FAILURES: Counter = Counter::new(
        "cg_supervisor_monitoring_failures_total",
        "Total contracts abandoned after exhausting the ingestion retry budget"
    ).expect("metric creation failed");

    // =========================================================================
    // STORE METRICS
    // =========================================================================

    /// Store write-conflict retries
    pub static ref STORE_WRITE_CONFLICTS: Counter = Counter::new(
        "cg_store_write_conflicts_total",
        "Total serializable write conflicts observed on the persistent store"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Component errors by type
    pub static ref COMPONENT_ERRORS: CounterVec = CounterVec::new(
        Opts::new("cg_component_errors_total", "Errors by component and type"),
        &["component", "error_type"]
    ).expect("metric creation failed");
}

/// Handle for the metrics server
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TRANSACTIONS_INGESTED.clone()),
        Box::new(TRANSACTIONS_DEDUPED.clone()),
        Box::new(CONTRACTS_ON_FALLBACK.clone()),
        Box::new(WATCHER_RECONNECTS.clone()),
        Box::new(RISK_EVALUATIONS.clone()),
        Box::new(FINDINGS_PRODUCED.clone()),
        Box::new(RISK_EVALUATION_DURATION.clone()),
        Box::new(VALIDATION_QUEUE_DEPTH.clone()),
        Box::new(VALIDATOR_CALLS.clone()),
        Box::new(VALIDATION_BUDGET_REMAINING.clone()),
        Box::new(PUBLISH_ATTEMPTS.clone()),
        Box::new(MONITORED_CONTRACTS.clone()),
        Box::new(PUSH_CLIENTS_CONNECTED.clone()),
        Box::new(INSTANCE_INFO.clone()),
        Box::new(METRICS_SCRAPE_TIMESTAMP_SECONDS.clone()),
        Box::new(MONITORING_FAILURES.clone()),
        Box::new(STORE_WRITE_CONFLICTS.clone()),
        Box::new(COMPONENT_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Refreshes the point-in-time gauges `GET /metrics` must surface (§6
/// `clientsCount`/`instanceId`/`timestamp`) right before encoding, so the
/// Prometheus exposition always reflects the current scrape rather than
/// whatever last touched these gauges.
pub fn record_scrape(instance_id: &str, clients_connected: usize, now: i64) {
    // `instance_id` is fixed for the process lifetime, so this only ever
    // touches the one label combination that matters.
    INSTANCE_INFO.with_label_values(&[instance_id]).set(1.0);
    PUSH_CLIENTS_CONNECTED.set(clients_connected as f64);
    METRICS_SCRAPE_TIMESTAMP_SECONDS.set(now as f64);
}

/// Encode all metrics as Prometheus text format, for `GET /metrics`.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        let result = register_metrics();
        // May fail if already registered by another test in this process, which is fine.
        let _ = result;
    }

    #[test]
    fn test_counter_increment() {
        TRANSACTIONS_DEDUPED.inc();
        assert!(TRANSACTIONS_DEDUPED.get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        CONTRACTS_ON_FALLBACK.set(3.0);
        assert_eq!(CONTRACTS_ON_FALLBACK.get(), 3.0);
    }

    #[test]
    fn test_histogram_timer() {
        let _timer = HistogramTimer::new(&RISK_EVALUATION_DURATION);
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}
