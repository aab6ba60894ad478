//! Process wiring: builds every adapter behind its domain port, resumes
//! monitoring for contracts already on record, and runs the process until
//! shutdown.
//!
//! ```text
//!                         ┌─────────────────┐
//!                         │     AppConfig    │
//!                         └────────┬─────────┘
//!                                  │
//!        ┌───────────────┬────────┼────────┬──────────────────┐
//!        ▼               ▼        ▼        ▼                  ▼
//!   PgStore      InMemoryEventBus   AlloyChainPublisher   HttpValidator
//!   (Store)    (+ RedisRelay, opt)     (AlertPublisher)     (Validator)
//!        │               │                 │                   │
//!        └───────┬───────┴────────┬────────┴─────────┬─────────┘
//!                ▼                ▼                  ▼
//!         Supervisor<AlloyChainEventSource, ReqwestHistorySource, _>
//!                │                                    │
//!                ▼                                    ▼
//!     per-contract Ingester (C5)            ValidationEngine (C3)
//!                │                                    │
//!                └──────────────┬─────────────────────┘
//!                               ▼
//!                    cg-07-ops-http axum server
//! ```
//!
//! One [`Supervisor`] owns every per-contract [`cg_05_ingester::Ingester`];
//! the validation queue and the baseline job each run as their own
//! long-lived task, and the operational HTTP surface runs as the
//! foreground task that `main` awaits.

use crate::adapters::{AlloyChainEventSource, RedisRelay, ReqwestHistorySource};
use crate::config::AppConfig;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use cg_02_baseline::BaselineJob;
use cg_03_validation_queue::{HttpValidator, ValidationEngine, ValidationQueue};
use cg_04_publisher::{AlertPublisher, AlloyChainPublisher, AlloyPublisherConfig, Publisher};
use cg_06_supervisor::{MonitorControl, Supervisor};
use cg_07_ops_http::AppState;
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::entities::{Address, Network};
use shared_types::store::Store;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Postgres pool size; §5 does not pin a number, so this follows the
/// gateway's own connection-pool default.
const DB_POOL_SIZE: u32 = 10;
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
const WORKER_SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(10);

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Resolves the publisher identity address: the address of
/// `TESTNET_PRIVATE_KEY` when configured, otherwise a zero address (no
/// on-chain publication ever reaches the chain in that case, so the
/// address itself is never inspected downstream).
fn publisher_address(config: &AppConfig) -> anyhow::Result<Address> {
    match &config.testnet_private_key {
        Some(key) => {
            let signer = PrivateKeySigner::from_str(key)?;
            Ok(Address::from(signer.address().to_string().as_str()))
        }
        None => Ok(Address::from(ZERO_ADDRESS)),
    }
}

async fn build_bus(config: &AppConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    match &config.redis_url {
        Some(url) => {
            let local = Arc::new(InMemoryEventBus::new());
            let relay = Arc::new(RedisRelay::connect(url.clone(), local).await?);
            relay.spawn_listener();
            info!("redis push relay active, instances share one logical topic bus");
            Ok(relay)
        }
        None => Ok(Arc::new(InMemoryEventBus::new())),
    }
}

fn build_source_factory(
    config: &AppConfig,
) -> impl Fn(&Address, Network) -> (Arc<AlloyChainEventSource>, Arc<ReqwestHistorySource>) + Send + Sync + 'static {
    let testnet_rpc = config.testnet.rpc_url.clone();
    let testnet_ws = config.testnet.ws_url.clone();
    let mainnet_rpc = config.mainnet.rpc_url.clone();
    let mainnet_ws = config.mainnet.ws_url.clone();
    let testnet_explorer = config.testnet_explorer_api_url.clone();
    let mainnet_explorer = config.mainnet_explorer_api_url.clone();
    let explorer_key = config.explorer_api_key.clone();

    move |_address: &Address, network: Network| match network {
        Network::Testnet => (
            Arc::new(AlloyChainEventSource::new(testnet_rpc.clone(), testnet_ws.clone())),
            Arc::new(ReqwestHistorySource::new(testnet_explorer.clone(), explorer_key.clone())),
        ),
        Network::Mainnet => (
            Arc::new(AlloyChainEventSource::new(mainnet_rpc.clone(), mainnet_ws.clone())),
            Arc::new(ReqwestHistorySource::new(mainnet_explorer.clone(), explorer_key.clone())),
        ),
    }
}

/// Builds every adapter, resumes monitoring for contracts already on
/// record, and blocks serving the operational HTTP surface until shutdown
/// (SIGINT) is requested.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(cg_store::PgStore::connect(&config.database_url, DB_POOL_SIZE).await?);

    let bus = build_bus(&config).await?;

    let registry_address = config
        .data_registry_address
        .clone()
        .unwrap_or_else(|| ZERO_ADDRESS.to_string());
    let chain_publisher = AlloyChainPublisher::new(AlloyPublisherConfig {
        rpc_url: config.testnet.rpc_url.clone(),
        registry_address,
        private_key: config.testnet_private_key.clone(),
    })?;
    let publisher = Arc::new(Publisher::new(Arc::new(chain_publisher)));
    publisher.register_schemas().await;
    let alert_publisher: Arc<dyn AlertPublisher> = publisher;
    let publisher_addr = publisher_address(&config)?;

    let queue = Arc::new(Mutex::new(ValidationQueue::new(unix_now())));
    let validator = Arc::new(HttpValidator::new(config.llm_webhook_url.clone()));
    let validation_engine = Arc::new(ValidationEngine::new(queue.clone(), validator, store.clone()));

    let source_factory = build_source_factory(&config);
    let supervisor = Arc::new(Supervisor::new(
        store.clone(),
        bus.clone(),
        alert_publisher,
        queue.clone(),
        publisher_addr,
        source_factory,
    ));

    resume_monitoring(&store, &supervisor).await;

    let baseline_job = Arc::new(BaselineJob::new(store.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let queue_worker = {
        let engine = validation_engine.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { engine.run_forever(unix_now, shutdown_rx).await })
    };
    let baseline_worker = {
        let job = baseline_job.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { job.run_forever(unix_now, shutdown_rx).await })
    };

    let monitor: Arc<dyn MonitorControl> = supervisor;
    let app_state = AppState::new(monitor, Arc::new(unix_now), config.instance_id.clone());
    let router = cg_07_ops_http::build_router(app_state, Some(config.frontend_url.as_str()));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "operational HTTP surface listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if tokio::time::timeout(WORKER_SHUTDOWN_GRACE, async {
        let _ = queue_worker.await;
        let _ = baseline_worker.await;
    })
    .await
    .is_err()
    {
        warn!("background workers did not exit within the shutdown grace period");
    }

    Ok(())
}

async fn resume_monitoring<C, H, F>(store: &Arc<dyn Store>, supervisor: &Arc<Supervisor<C, H, F>>)
where
    C: cg_05_ingester::ChainEventSource + 'static,
    H: cg_05_ingester::HistorySource + 'static,
    F: Fn(&Address, Network) -> (Arc<C>, Arc<H>) + Send + Sync + 'static,
{
    let contracts = match store.list_monitored_contracts().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load monitored contracts at startup");
            return;
        }
    };

    for contract in contracts {
        let address = contract.address.clone();
        let network = contract.network;
        if let Err(e) = supervisor.start(address.clone(), network, unix_now).await {
            warn!(contract = %address, error = %e, "failed to resume monitoring at startup");
        } else {
            info!(contract = %address, %network, "resumed monitoring from store state");
        }
    }
}

async fn shutdown_signal(shutdown_tx: tokio::sync::watch::Sender<bool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
    let _ = shutdown_tx.send(true);
}
