//! nsm-broker entry point.
//!
//! Wires the broker from the environment, waits for the registry, and shuts
//! down cleanly on Ctrl-C.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use nsm_broker::config::BrokerConfig;
use nsm_broker::services::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BrokerConfig::from_env().context("loading configuration")?;
    tracing::info!(
        registry = %config.registry_address,
        public_api = %config.public_api(),
        workspace_root = %config.workspace_root,
        "starting nsm-broker"
    );

    // The VNI pool is supplied by the process embedding the broker.
    let services = Services::from_config(&config, None);
    match &services.device_plugin_path {
        Some(path) => {
            tracing::info!(device_plugin = %path.display(), "device-plugin path override");
        }
        None => tracing::debug!("no device-plugin path override"),
    }

    match services.resolver.sibling_connection().await {
        Ok((_, channel)) => {
            tracing::info!(channel = %channel.id(), "local control plane is up");
            channel.close();
        }
        Err(e) => tracing::warn!(error = %e, "local control plane not available"),
    }

    let broker = services.broker.clone();
    let registry = tokio::spawn(async move {
        match broker.registry_client().await {
            Ok(client) => {
                tracing::info!(channel = %client.channel().id(), "registry client ready");
            }
            Err(e) => tracing::warn!(error = %e, "registry client unavailable"),
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested");

    services.stop();
    registry.await.context("joining registry task")?;

    Ok(())
}
