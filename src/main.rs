//! Chainfolio daemon.
//!
//! Builds the engine from environment configuration, runs an initial cycle,
//! logs the aggregated snapshot, and keeps polling until ctrl-c.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chainfolio::{
    ethereum::{EvmClient, RpcReadTransport},
    quotefeed::CoinMarketCapFeed,
    services::PortfolioEngine,
    Config, ProtocolRegistry, Registry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!("Starting Chainfolio portfolio engine");

    let registry = Arc::new(Registry::default_mainnet()?);
    let client = EvmClient::new(&config.rpc_urls)?;
    let transport = Arc::new(RpcReadTransport::new(client));
    let quote_feed = Arc::new(CoinMarketCapFeed::new(config.quote_api_key.clone()));
    let protocols = Arc::new(ProtocolRegistry::with_defaults());

    let engine = Arc::new(PortfolioEngine::with_price_ttl(
        config.owners.clone(),
        registry,
        transport,
        quote_feed,
        protocols,
        config.price_interval,
    ));

    engine.run_cycle().await;

    for entry in engine.aggregated_balances().await {
        tracing::info!(
            symbol = %entry.symbol,
            name = %entry.display_name,
            total_usd = entry.total_usd,
            "Aggregated balance"
        );
    }

    engine.schedule(config.balance_interval, config.price_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    engine.stop();

    Ok(())
}
