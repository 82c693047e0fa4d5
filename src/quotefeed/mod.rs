//! CoinMarketCap quote feed transport.
//!
//! One batched `quotes/latest` request for the union of requested symbols,
//! folded into a lowercase-symbol → USD price map. Symbols the feed does not
//! know are simply absent from the response.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    transport::QuoteFeedTransport,
};

/// CoinMarketCap `quotes/latest` endpoint.
pub const COINMARKETCAP_QUOTES_URL: &str =
    "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";

#[derive(Debug, Deserialize)]
struct UsdQuote {
    price: f64,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    symbol: String,
    quote: Quote,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    data: HashMap<String, QuoteEntry>,
}

/// [`QuoteFeedTransport`] implementation over the CoinMarketCap HTTP API.
pub struct CoinMarketCapFeed {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CoinMarketCapFeed {
    /// Create a feed using the production endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, COINMARKETCAP_QUOTES_URL.to_string())
    }

    /// Create a feed against a custom endpoint (used by tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { client: reqwest::Client::new(), base_url, api_key }
    }
}

#[async_trait]
impl QuoteFeedTransport for CoinMarketCapFeed {
    async fn usd_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let query: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        let query = query.join(",");

        tracing::debug!(symbols = %query, "Fetching quote feed prices");

        let response = self
            .client
            .get(&self.base_url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .query(&[("symbol", query.as_str()), ("convert", "usd")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::QuoteFeed(format!(
                "Quote request failed with status {}",
                response.status()
            )));
        }

        let body: QuotesResponse = response.json().await?;

        Ok(body
            .data
            .into_values()
            .map(|entry| (entry.symbol.to_lowercase(), entry.quote.usd.price))
            .collect())
    }
}
