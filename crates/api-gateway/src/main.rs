//! # Rasputin API Gateway
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`RASPUTIN_CONFIG` JSON file if set, then `RASPUTIN_*` overrides)
//! 2. Initialize telemetry
//! 3. Connect the broker and make sure the ingress channel exists
//! 4. Serve HTTP until Ctrl+C, then shut down gracefully

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use api_gateway::{ApiGatewayService, BrokerConfig, GatewayConfig};
use rasputin_telemetry::{init_telemetry, TelemetryConfig};
use shared_broker::InMemoryBroker;
use tracing::{info, warn};

fn load_config() -> Result<GatewayConfig> {
    let base = match std::env::var("RASPUTIN_CONFIG") {
        Ok(path) => GatewayConfig::from_json_file(&path)
            .with_context(|| format!("loading config file {path}"))?,
        Err(_) => GatewayConfig::default(),
    };

    let config = base
        .with_env_overrides(|key| std::env::var(key).ok())
        .context("applying environment overrides")?;
    config.validate().context("validating configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let config = load_config()?;
    info!(
        version = api_gateway::VERSION,
        http = %config.http_addr(),
        broker = %config.broker.endpoint,
        reply_timeout_ms = config.timeouts.reply.as_millis() as u64,
        "Starting API Gateway"
    );

    // Only the in-process broker ships with the gateway; networked brokers
    // plug in through the `Broker` trait.
    if !config.broker.is_in_memory() {
        bail!(
            "unsupported broker endpoint {:?}: only {} endpoints are built in",
            config.broker.endpoint,
            BrokerConfig::IN_MEMORY_SCHEME
        );
    }
    warn!(
        ingress = %config.broker.ingress_channel,
        "Running standalone on the in-memory broker; requests wait for a router in this process"
    );
    let broker = Arc::new(InMemoryBroker::with_channels([
        config.broker.ingress_channel.as_str(),
    ]));

    let mut service = ApiGatewayService::new(config, broker)?;
    let addr = service.start().await?;
    info!(%addr, "API Gateway is running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;

    info!("Shutdown signal received");
    service.shutdown().await?;
    Ok(())
}
