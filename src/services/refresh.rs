//! Refresh controller and consumer-facing read surface.
//!
//! All periodic re-execution is centralized here: no other component retries
//! or owns a timer. A cycle runs plan → fetch → price → aggregate and then
//! publishes its output with a single snapshot swap. Cycles are numbered;
//! a cycle that finishes after a newer one has published is discarded whole
//! (last-cycle-wins, never per-field merging of stale data).

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy::primitives::Address;
use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    registry::{PricingStrategy, Registry},
    services::{
        aggregate::Aggregator,
        balance::BalanceFetcher,
        planner,
        prices::{ProtocolPriceFetcher, QuoteFetcher},
        pricing::{ProtocolRegistry, TokenInstance},
        symbols::normalize,
    },
    transport::{ChainReadTransport, QuoteFeedTransport},
    types::{
        AccountBalances, AggregatedBalance, BalanceQueryResult, PriceQuote, QueryOutcome,
    },
};

/// One cycle's published output. Replaced wholesale, never mutated in place.
#[derive(Default)]
pub struct Snapshot {
    /// Monotonic sequence number of the cycle that produced this snapshot.
    pub cycle_seq: u64,
    /// Per-owner balances.
    pub accounts: HashMap<Address, AccountBalances>,
    /// Cross-account breakdown, sorted by USD value descending.
    pub aggregated: Vec<AggregatedBalance>,
    /// The cycle's balance results, kept so price-only refreshes can
    /// re-aggregate without refetching balances.
    results: Vec<BalanceQueryResult>,
}

/// The portfolio aggregation engine.
pub struct PortfolioEngine {
    owners: Vec<Address>,
    registry: Arc<Registry>,
    balances: BalanceFetcher,
    quotes: QuoteFetcher,
    protocol_prices: ProtocolPriceFetcher,
    aggregator: Aggregator,
    snapshot: Arc<RwLock<Snapshot>>,
    cycle_counter: AtomicU64,
    in_flight: AtomicUsize,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl PortfolioEngine {
    /// Create an engine with the default price freshness window.
    pub fn new(
        owners: Vec<Address>,
        registry: Arc<Registry>,
        transport: Arc<dyn ChainReadTransport>,
        quote_feed: Arc<dyn QuoteFeedTransport>,
        protocols: Arc<ProtocolRegistry>,
    ) -> Self {
        Self::with_price_ttl(
            owners,
            registry,
            transport,
            quote_feed,
            protocols,
            crate::services::prices::DEFAULT_PRICE_TTL,
        )
    }

    /// Create an engine with a custom price freshness window.
    pub fn with_price_ttl(
        owners: Vec<Address>,
        registry: Arc<Registry>,
        transport: Arc<dyn ChainReadTransport>,
        quote_feed: Arc<dyn QuoteFeedTransport>,
        protocols: Arc<ProtocolRegistry>,
        price_ttl: Duration,
    ) -> Self {
        Self {
            owners,
            balances: BalanceFetcher::new(Arc::clone(&transport), Arc::clone(&registry)),
            quotes: QuoteFetcher::with_ttl(quote_feed, price_ttl),
            protocol_prices: ProtocolPriceFetcher::with_ttl(transport, protocols, price_ttl),
            aggregator: Aggregator::new(Arc::clone(&registry)),
            registry,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
            cycle_counter: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Execute one full cycle. Returns the cycle's sequence number.
    ///
    /// The balance fetch and a quote-feed warmup (from registry symbol hints)
    /// start concurrently; the protocol price read needs decimals from the
    /// balance results, so it follows the fetch. The cycle's output is
    /// published only if no newer cycle has published first.
    pub async fn run_cycle(&self) -> u64 {
        let seq = self.cycle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(cycle = seq, "Starting refresh cycle");

        let plan = planner::plan(&self.owners, &self.registry);
        let expected_symbols = self.expected_quote_symbols();

        let (results, _warmup) =
            tokio::join!(self.balances.fetch(&plan), self.quotes.fetch(&expected_symbols));

        self.price_and_publish(seq, results).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        seq
    }

    /// Refresh prices only, re-aggregating the latest cycle's balance results.
    /// No-op until a first cycle has published.
    pub async fn refresh_prices(&self) -> u64 {
        let results = self.snapshot.read().await.results.clone();
        if results.is_empty() {
            return self.snapshot.read().await.cycle_seq;
        }

        let seq = self.cycle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        self.quotes.invalidate().await;
        self.protocol_prices.invalidate().await;
        self.price_and_publish(seq, results).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        seq
    }

    /// Trigger an immediate full cycle outside the schedule, bypassing the
    /// price caches.
    pub async fn refetch_now(&self) -> u64 {
        self.quotes.invalidate().await;
        self.protocol_prices.invalidate().await;
        self.run_cycle().await
    }

    /// Arrange periodic re-execution: full cycles on the balance cadence,
    /// price-only refreshes on the price cadence. The first scheduled run of
    /// each task happens one full interval after this call (the caller has
    /// typically just run a cycle itself), and [`Self::stop`] releases the
    /// timers.
    pub fn schedule(self: &Arc<Self>, balance_interval: Duration, price_interval: Duration) {
        let engine = Arc::clone(self);
        let balance_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(balance_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.run_cycle().await;
            }
        });

        let engine = Arc::clone(self);
        let price_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(price_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.refresh_prices().await;
            }
        });

        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.push(balance_task);
        timers.push(price_task);
    }

    /// Stop all scheduled polling. In-flight cycles finish (and publish only
    /// if still the newest); no new ones start.
    pub fn stop(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        for timer in timers.drain(..) {
            timer.abort();
        }
    }

    // ------------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------------

    /// Balances of one owner from the latest snapshot.
    pub async fn account_balances(&self, owner: Address) -> Option<AccountBalances> {
        self.snapshot.read().await.accounts.get(&owner).cloned()
    }

    /// Cross-account breakdown from the latest snapshot.
    pub async fn aggregated_balances(&self) -> Vec<AggregatedBalance> {
        self.snapshot.read().await.aggregated.clone()
    }

    /// True while any cycle is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// True if any account in the latest snapshot had a failed query.
    pub async fn has_error(&self) -> bool {
        self.snapshot.read().await.accounts.values().any(|a| a.has_error)
    }

    /// Sequence number of the cycle that produced the latest snapshot.
    pub async fn cycle_seq(&self) -> u64 {
        self.snapshot.read().await.cycle_seq
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Fetch prices for the given results, aggregate, and publish if `seq`
    /// is still newer than the published snapshot.
    async fn price_and_publish(&self, seq: u64, results: Vec<BalanceQueryResult>) {
        let (quote_symbols, protocol_instances) = self.classify(&results);

        let (quote_prices, protocol_prices) = tokio::join!(
            self.quotes.fetch(&quote_symbols),
            self.protocol_prices.fetch(&protocol_instances)
        );

        let quote_prices: HashMap<String, PriceQuote> = match quote_prices {
            Ok(prices) => prices,
            Err(err) => {
                tracing::warn!(cycle = seq, error = %err, "Quote feed unavailable, pricing at zero");
                HashMap::new()
            }
        };

        let (accounts, aggregated) =
            self.aggregator.aggregate(&results, &quote_prices, &protocol_prices);

        let mut snapshot = self.snapshot.write().await;
        if seq > snapshot.cycle_seq {
            *snapshot = Snapshot { cycle_seq: seq, accounts, aggregated, results };
            tracing::info!(cycle = seq, "Published snapshot");
        } else {
            tracing::debug!(
                cycle = seq,
                published = snapshot.cycle_seq,
                "Discarding superseded cycle"
            );
        }
    }

    /// Split successful results into the quote-feed symbol union and the
    /// distinct protocol-priced token instances.
    fn classify(
        &self,
        results: &[BalanceQueryResult],
    ) -> (Vec<String>, Vec<(TokenInstance, crate::registry::ProtocolId)>) {
        let mut quote_symbols = Vec::new();
        let mut protocol_instances = Vec::new();

        for result in results {
            let QueryOutcome::Success { symbol, decimals, .. } = &result.outcome else {
                continue;
            };
            let canonical = normalize(symbol);

            match (self.registry.resolve_strategy(&canonical), &result.query.token) {
                (PricingStrategy::ProtocolDerived(id), Some(token)) => {
                    protocol_instances.push((
                        TokenInstance {
                            symbol: canonical,
                            chain_id: result.query.chain_id,
                            address: token.address,
                            decimals: *decimals,
                        },
                        id,
                    ));
                }
                // A protocol strategy on a native token has no contract to
                // read and no instance key; it stays unpriced.
                (PricingStrategy::ProtocolDerived(_), None) => {}
                (PricingStrategy::QuoteFeed, _) => quote_symbols.push(canonical),
            }
        }

        (quote_symbols, protocol_instances)
    }

    /// Symbol union derivable before any fetch: native symbols plus the
    /// registry's symbol hints, minus protocol-priced ones. Used to warm the
    /// quote cache concurrently with the balance fetch.
    fn expected_quote_symbols(&self) -> Vec<String> {
        let mut symbols = Vec::new();
        for chain in self.registry.chains() {
            symbols.push(normalize(&chain.native_symbol));
            for token in self.registry.tokens_on(chain.id) {
                let canonical = normalize(&token.symbol_hint);
                if self.registry.resolve_strategy(&canonical) == PricingStrategy::QuoteFeed {
                    symbols.push(canonical);
                }
            }
        }
        symbols
    }
}

impl Drop for PortfolioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
