//! Chainfolio Portfolio Aggregation Engine
//!
//! Discovers native and fungible token balances for a set of owner addresses
//! across multiple independent chains, resolves a USD price for each token
//! through a strategy table mixing off-chain quotes with on-chain exchange
//! rates, and aggregates everything into per-account and cross-account views.
//!
//! # Features
//!
//! - **Query planning**: one deterministic plan per cycle over owners ×
//!   chains × tokens
//! - **Batched balance reads**: one Multicall3 round trip per chain, native
//!   balances in parallel
//! - **Strategy pricing**: batched quote-feed prices plus protocol-derived
//!   on-chain exchange rates
//! - **Exact aggregation**: U256 raw-amount sums, float USD display values
//!
//! # Example
//!
//! ```rust,ignore
//! use chainfolio::{Config, PortfolioEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let engine = /* build from config */;
//!     engine.run_cycle().await;
//!     for entry in engine.aggregated_balances().await {
//!         println!("{}: ${:.2}", entry.symbol, entry.total_usd);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ethereum;
pub mod quotefeed;
pub mod registry;
pub mod services;
pub mod transport;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use registry::{ChainDescriptor, PricingStrategy, ProtocolId, Registry, TokenDescriptor};
pub use services::{PortfolioEngine, ProtocolRegistry};
