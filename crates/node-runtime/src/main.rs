//! ChainGuard node runtime entry point: loads configuration, brings up the
//! LGTM telemetry stack, and hands off to [`node_runtime::wiring::run`].

use node_runtime::config::AppConfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let telemetry_config = cg_telemetry::TelemetryConfig::from_env();
    let _telemetry_guard = cg_telemetry::init_telemetry(telemetry_config)
        .await
        .map_err(|e| anyhow::anyhow!("telemetry initialization failed: {e}"))?;

    info!(
        node_env = ?config.node_env,
        port = config.port,
        instance_id = %config.instance_id,
        "chainguard node runtime starting"
    );

    if let Err(e) = node_runtime::wiring::run(config).await {
        error!(error = %e, "node runtime exited with an error");
        return Err(e);
    }

    info!("chainguard node runtime stopped");
    Ok(())
}
