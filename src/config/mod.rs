//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

use std::{collections::HashMap, env, time::Duration};

use alloy::primitives::Address;

use crate::error::AppError;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint per chain id.
    pub rpc_urls: HashMap<u64, String>,
    /// Owner addresses to aggregate.
    pub owners: Vec<Address>,
    /// CoinMarketCap API key for the quote feed.
    pub quote_api_key: String,
    /// Cadence of full balance cycles.
    pub balance_interval: Duration,
    /// Cadence of price-only refreshes (also the price cache freshness window).
    pub price_interval: Duration,
    /// Logging level (default: info).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `CHAINFOLIO_RPC_URLS`: comma-separated `chain_id=url` pairs,
    ///   e.g. `1=https://eth.example,42161=https://arb.example`
    /// - `CHAINFOLIO_OWNERS`: comma-separated owner addresses
    /// - `COINMARKETCAP_API_KEY`: quote feed API key
    ///
    /// Optional environment variables:
    /// - `CHAINFOLIO_BALANCE_POLL_SECS`: balance cycle cadence (default: 30)
    /// - `CHAINFOLIO_PRICE_POLL_SECS`: price refresh cadence (default: 60)
    /// - `LOG_LEVEL`: logging level (default: info)
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let rpc_urls = parse_rpc_urls(&env::var("CHAINFOLIO_RPC_URLS").map_err(|_| {
            AppError::Config("CHAINFOLIO_RPC_URLS environment variable not set".into())
        })?)?;

        let owners = parse_owners(&env::var("CHAINFOLIO_OWNERS").map_err(|_| {
            AppError::Config("CHAINFOLIO_OWNERS environment variable not set".into())
        })?)?;

        let quote_api_key = env::var("COINMARKETCAP_API_KEY").map_err(|_| {
            AppError::Config("COINMARKETCAP_API_KEY environment variable not set".into())
        })?;

        let balance_interval = parse_secs("CHAINFOLIO_BALANCE_POLL_SECS", 30)?;
        let price_interval = parse_secs("CHAINFOLIO_PRICE_POLL_SECS", 60)?;
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self { rpc_urls, owners, quote_api_key, balance_interval, price_interval, log_level })
    }
}

fn parse_rpc_urls(raw: &str) -> Result<HashMap<u64, String>, AppError> {
    let mut urls = HashMap::new();
    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (chain_id, url) = pair.split_once('=').ok_or_else(|| {
            AppError::Config(format!("Invalid RPC URL entry (expected chain_id=url): {pair}"))
        })?;
        let chain_id: u64 = chain_id
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid chain id: {chain_id}")))?;
        urls.insert(chain_id, url.trim().to_string());
    }
    if urls.is_empty() {
        return Err(AppError::Config("CHAINFOLIO_RPC_URLS contains no entries".into()));
    }
    Ok(urls)
}

fn parse_owners(raw: &str) -> Result<Vec<Address>, AppError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<Address>()
                .map_err(|_| AppError::Config(format!("Invalid owner address: {s}")))
        })
        .collect()
}

fn parse_secs(var: &str, default: u64) -> Result<Duration, AppError> {
    match env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::Config(format!("Invalid {var}: {value}"))),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rpc_urls() {
        let urls = parse_rpc_urls("1=https://eth.example, 42161=https://arb.example").unwrap();
        assert_eq!(urls.get(&1).unwrap(), "https://eth.example");
        assert_eq!(urls.get(&42161).unwrap(), "https://arb.example");
    }

    #[test]
    fn test_parse_rpc_urls_rejects_malformed() {
        assert!(parse_rpc_urls("not-a-pair").is_err());
        assert!(parse_rpc_urls("x=https://eth.example").is_err());
        assert!(parse_rpc_urls("").is_err());
    }

    #[test]
    fn test_parse_owners() {
        let owners = parse_owners(
            "0x0000000000000000000000000000000000000001,0x0000000000000000000000000000000000000002",
        )
        .unwrap();
        assert_eq!(owners.len(), 2);
    }

    #[test]
    fn test_parse_owners_rejects_garbage() {
        assert!(parse_owners("0xnot-an-address").is_err());
    }

    #[test]
    fn test_parse_owners_empty_is_allowed() {
        // An empty owner set is valid configuration: it just plans no work
        assert!(parse_owners("").unwrap().is_empty());
    }
}
