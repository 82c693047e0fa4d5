//! Price fetchers.
//!
//! Two independent sub-components, independently pollable:
//!
//! - [`QuoteFetcher`] prices the union of quote-feed symbols in one batched
//!   off-chain request, keyed by canonical symbol.
//! - [`ProtocolPriceFetcher`] prices protocol tokens from on-chain exchange
//!   rates, keyed by `(symbol, chain_id)` since the rate is specific to the
//!   contract instance.
//!
//! The cache key shapes differ on purpose and must not be unified. Both
//! fetchers cache within a freshness window and coalesce identical concurrent
//! refreshes through a single-permit semaphore.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{RwLock, Semaphore};

use crate::{
    error::{AppError, Result},
    registry::ProtocolId,
    services::pricing::{ProtocolRegistry, TokenInstance},
    transport::{ChainReadTransport, QuoteFeedTransport, ReadCall},
    types::PriceQuote,
};

/// Default freshness window for cached prices.
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(60);

/// A cached lookup result. `None` price means the source had no quote; caching
/// the miss keeps unknown symbols from forcing a refetch every cycle.
#[derive(Debug, Clone, Copy)]
struct CachedQuote {
    usd_price: Option<f64>,
    fetched_at: Instant,
}

impl CachedQuote {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() <= ttl
    }

    fn to_quote(self) -> Option<PriceQuote> {
        self.usd_price.map(|usd_price| PriceQuote { usd_price, fetched_at: self.fetched_at })
    }
}

// ============================================================================
// Quote-feed fetcher
// ============================================================================

/// Batched quote-feed price fetcher with a freshness-window cache.
pub struct QuoteFetcher {
    feed: Arc<dyn QuoteFeedTransport>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedQuote>>,
    refresh_gate: Semaphore,
}

impl QuoteFetcher {
    /// Create a fetcher with the default freshness window.
    pub fn new(feed: Arc<dyn QuoteFeedTransport>) -> Self {
        Self::with_ttl(feed, DEFAULT_PRICE_TTL)
    }

    /// Create a fetcher with a custom freshness window.
    pub fn with_ttl(feed: Arc<dyn QuoteFeedTransport>, ttl: Duration) -> Self {
        Self { feed, ttl, cache: RwLock::new(HashMap::new()), refresh_gate: Semaphore::new(1) }
    }

    /// Fetch USD quotes for the deduplicated symbol union of one cycle.
    ///
    /// Symbols the feed does not know get no entry; downstream treats that as
    /// price zero. Identical concurrent requests coalesce into one in-flight
    /// call: whoever loses the refresh gate race re-reads the cache first.
    pub async fn fetch(&self, symbols: &[String]) -> Result<HashMap<String, PriceQuote>> {
        let mut requested: Vec<String> = symbols.to_vec();
        requested.sort();
        requested.dedup();

        if requested.is_empty() {
            return Ok(HashMap::new());
        }

        if let Some(hit) = self.lookup_fresh(&requested).await {
            return Ok(hit);
        }

        let _permit = self
            .refresh_gate
            .acquire()
            .await
            .map_err(|_| AppError::QuoteFeed("Refresh gate closed".to_string()))?;

        // A coalesced refresh may have filled the cache while we waited
        if let Some(hit) = self.lookup_fresh(&requested).await {
            return Ok(hit);
        }

        tracing::debug!(symbols = requested.len(), "Refreshing quote feed prices");
        let prices = self.feed.usd_prices(&requested).await?;

        let now = Instant::now();
        let mut cache = self.cache.write().await;
        for symbol in &requested {
            cache.insert(
                symbol.clone(),
                CachedQuote { usd_price: prices.get(symbol).copied(), fetched_at: now },
            );
        }

        Ok(requested
            .iter()
            .filter_map(|s| cache.get(s).and_then(|c| c.to_quote()).map(|q| (s.clone(), q)))
            .collect())
    }

    /// Drop all cached quotes so the next fetch hits the feed.
    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }

    async fn lookup_fresh(&self, requested: &[String]) -> Option<HashMap<String, PriceQuote>> {
        let cache = self.cache.read().await;
        if !requested.iter().all(|s| cache.get(s).is_some_and(|c| c.is_fresh(self.ttl))) {
            return None;
        }
        Some(
            requested
                .iter()
                .filter_map(|s| cache.get(s).and_then(|c| c.to_quote()).map(|q| (s.clone(), q)))
                .collect(),
        )
    }
}

// ============================================================================
// Protocol price fetcher
// ============================================================================

/// On-chain protocol price fetcher with a freshness-window cache keyed by
/// `(canonical symbol, chain id)`.
pub struct ProtocolPriceFetcher {
    transport: Arc<dyn ChainReadTransport>,
    protocols: Arc<ProtocolRegistry>,
    ttl: Duration,
    cache: RwLock<HashMap<(String, u64), CachedQuote>>,
    refresh_gate: Semaphore,
}

impl ProtocolPriceFetcher {
    /// Create a fetcher with the default freshness window.
    pub fn new(transport: Arc<dyn ChainReadTransport>, protocols: Arc<ProtocolRegistry>) -> Self {
        Self::with_ttl(transport, protocols, DEFAULT_PRICE_TTL)
    }

    /// Create a fetcher with a custom freshness window.
    pub fn with_ttl(
        transport: Arc<dyn ChainReadTransport>,
        protocols: Arc<ProtocolRegistry>,
        ttl: Duration,
    ) -> Self {
        Self {
            transport,
            protocols,
            ttl,
            cache: RwLock::new(HashMap::new()),
            refresh_gate: Semaphore::new(1),
        }
    }

    /// Fetch protocol-derived prices for the given distinct token instances.
    ///
    /// Failed or missing reads yield no entry for that key; the aggregator
    /// treats a missing key as price zero. A chain batch failure degrades only
    /// that chain's instances.
    pub async fn fetch(
        &self,
        instances: &[(TokenInstance, ProtocolId)],
    ) -> HashMap<(String, u64), PriceQuote> {
        if instances.is_empty() {
            return HashMap::new();
        }

        // Deduplicate by cache key, first occurrence wins
        let mut distinct: Vec<&(TokenInstance, ProtocolId)> = Vec::new();
        for pair in instances {
            let key = (pair.0.symbol.clone(), pair.0.chain_id);
            if !distinct.iter().any(|(i, _)| (i.symbol.clone(), i.chain_id) == key) {
                distinct.push(pair);
            }
        }

        if let Some(hit) = self.lookup_fresh(&distinct).await {
            return hit;
        }

        let Ok(_permit) = self.refresh_gate.acquire().await else {
            return HashMap::new();
        };

        if let Some(hit) = self.lookup_fresh(&distinct).await {
            return hit;
        }

        // Group reads per chain so each chain costs one round trip
        let mut by_chain: HashMap<u64, Vec<(&TokenInstance, ProtocolId, ReadCall)>> =
            HashMap::new();
        for (instance, protocol_id) in &distinct {
            let Some(pricer) = self.protocols.get(*protocol_id) else {
                tracing::warn!(?protocol_id, "No pricer registered for protocol");
                continue;
            };
            let read = pricer.build_read(instance);
            by_chain.entry(instance.chain_id).or_default().push((instance, *protocol_id, read));
        }

        let now = Instant::now();
        let mut cache = self.cache.write().await;

        for (chain_id, entries) in by_chain {
            let calls: Vec<ReadCall> = entries.iter().map(|(_, _, read)| read.clone()).collect();

            let outcomes = match self.transport.read_batch(chain_id, &calls).await {
                Ok(outcomes) if outcomes.len() == calls.len() => outcomes,
                Ok(_) | Err(_) => {
                    tracing::warn!(chain_id, "Protocol price batch failed");
                    continue;
                }
            };

            for ((instance, protocol_id, _), outcome) in entries.iter().zip(outcomes) {
                let price = if outcome.success {
                    self.protocols
                        .get(*protocol_id)
                        .and_then(|pricer| pricer.decode(instance, &outcome.data))
                } else {
                    None
                };
                cache.insert(
                    (instance.symbol.clone(), instance.chain_id),
                    CachedQuote { usd_price: price, fetched_at: now },
                );
            }
        }

        distinct
            .iter()
            .filter_map(|(instance, _)| {
                let key = (instance.symbol.clone(), instance.chain_id);
                cache.get(&key).and_then(|c| c.to_quote()).map(|q| (key, q))
            })
            .collect()
    }

    /// Drop all cached prices so the next fetch hits the chain.
    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }

    async fn lookup_fresh(
        &self,
        distinct: &[&(TokenInstance, ProtocolId)],
    ) -> Option<HashMap<(String, u64), PriceQuote>> {
        let cache = self.cache.read().await;
        let all_fresh = distinct.iter().all(|(instance, _)| {
            cache
                .get(&(instance.symbol.clone(), instance.chain_id))
                .is_some_and(|c| c.is_fresh(self.ttl))
        });
        if !all_fresh {
            return None;
        }
        Some(
            distinct
                .iter()
                .filter_map(|(instance, _)| {
                    let key = (instance.symbol.clone(), instance.chain_id);
                    cache.get(&key).and_then(|c| c.to_quote()).map(|q| (key, q))
                })
                .collect(),
        )
    }
}
