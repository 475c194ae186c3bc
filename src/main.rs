//! Liquidity provider server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                 ┌──────────────────────────────────────────────┐
//!     ───── POST /getQuote ─▶│ http ─▶ quoting::protocol ─▶ providers       │
//!     ── POST /acceptQuote ─▶│              │          │                     │
//!                            │              ▼          ▼                     │
//!                            │      blockchain::connector   storage          │
//!                            │       (retry, gas, hash)   (quotes by hash)   │
//!                            │              │                                │
//!                            │              ▼                                │
//!                            │        federation (deposit address)           │
//!                            └──────────────┼───────────────────────────────┘
//!                                           ▼
//!                                    EVM node (bridge + LBC)
//! ```
//!
//! Startup order: config → logging → metrics → chain connector →
//! providers → store → HTTP server. Shutdown drains HTTP and then
//! writes the store snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use liquidity_bridge::blockchain::{
    ChainConnector, ConnectorSettings, EmergencyBranch, RpcNode,
};
use liquidity_bridge::codec::decode_evm_address;
use liquidity_bridge::config::{load_config, LpsConfig};
use liquidity_bridge::http::HttpServer;
use liquidity_bridge::lifecycle::{shutdown_on_signal, Shutdown};
use liquidity_bridge::observability::{logging, metrics};
use liquidity_bridge::quoting::{LiquidityProvider, LocalProvider, ProviderRegistry, QuoteProtocol};
use liquidity_bridge::storage::InMemoryQuoteStore;

#[derive(Parser, Debug)]
#[command(name = "liquidity-bridge", version, about = "Liquidity provider quote server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "LPS_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "liquidity-bridge starting");
    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.server.bind_address,
        rpc_url = %config.rsk.rpc_url,
        providers = config.providers.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let connector = build_connector(&config)?;
    connector.verify_connection().await;

    let registry = build_registry(&config)?;
    let store = match &config.storage.persistence_path {
        Some(path) => InMemoryQuoteStore::load_from_file(path)?,
        None => InMemoryQuoteStore::new(None),
    };

    let protocol = Arc::new(QuoteProtocol::new(
        connector,
        registry,
        Arc::new(store.clone()),
        config.btc.network.to_network(),
    ));

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(protocol, config.server.clone());
    server.run(listener, shutdown).await?;

    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to write quote snapshot");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_connector(
    config: &LpsConfig,
) -> Result<ChainConnector<RpcNode>, Box<dyn std::error::Error>> {
    let emergency = EmergencyBranch::from_config(&config.federation)?;
    let settings = ConnectorSettings::from_config(&config.rsk, emergency)?;
    let node = RpcNode::new(
        &config.rsk.rpc_url,
        settings.lbc_address,
        decode_evm_address(&config.rsk.bridge_address)?,
        Duration::from_secs(config.rsk.rpc_timeout_secs),
    )?;
    Ok(ChainConnector::new(node, settings))
}

fn build_registry(config: &LpsConfig) -> Result<ProviderRegistry, Box<dyn std::error::Error>> {
    let mut providers: Vec<Arc<dyn LiquidityProvider>> = Vec::with_capacity(config.providers.len());
    for provider_config in &config.providers {
        let provider = LocalProvider::from_config(provider_config, config.rsk.chain_id)?;
        tracing::info!(
            provider = %provider_config.name,
            address = %provider.address(),
            "Liquidity provider registered"
        );
        providers.push(Arc::new(provider));
    }
    Ok(ProviderRegistry::new(providers))
}
