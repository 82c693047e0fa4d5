//! Aggregator.
//!
//! Joins balance results with resolved prices into per-account balance sets
//! and the cross-account breakdown. Raw amounts are summed exactly in U256;
//! USD values are summed as floats. The cross-account key is the canonical
//! symbol only, never the contract address, so a token appearing on several
//! chains under one symbol is merged.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use alloy::primitives::Address;

use crate::{
    registry::{PricingStrategy, Registry},
    services::symbols::normalize,
    types::{
        u256_to_f64, AccountBalanceRecord, AccountBalances, AggregatedBalance, BalanceQueryResult,
        PriceQuote, QueryOutcome,
    },
};

/// Service folding one cycle's results into consumer-visible balances.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<Registry>,
}

impl Aggregator {
    /// Create a new aggregator.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Join results with prices into per-account and cross-account views.
    ///
    /// Failed queries set `has_error` on their owner without dropping that
    /// owner's successful records. A missing price values the record at zero;
    /// the record itself is always kept.
    pub fn aggregate(
        &self,
        results: &[BalanceQueryResult],
        quote_prices: &HashMap<String, PriceQuote>,
        protocol_prices: &HashMap<(String, u64), PriceQuote>,
    ) -> (HashMap<Address, AccountBalances>, Vec<AggregatedBalance>) {
        let mut accounts: HashMap<Address, AccountBalances> = HashMap::new();

        for result in results {
            let owner = result.query.owner;
            let account = accounts
                .entry(owner)
                .or_insert_with(|| AccountBalances { owner, ..AccountBalances::default() });

            let (raw_amount, symbol, decimals) = match &result.outcome {
                QueryOutcome::Success { raw_amount, symbol, decimals } => {
                    (*raw_amount, symbol, *decimals)
                }
                QueryOutcome::Failed => {
                    account.has_error = true;
                    continue;
                }
            };

            let canonical = normalize(symbol);
            let price = self.lookup_price(&canonical, result.query.chain_id, quote_prices, protocol_prices);
            let usd_value = u256_to_f64(raw_amount, decimals) * price;

            account.records.push(AccountBalanceRecord {
                symbol: canonical.clone(),
                display_name: self.registry.display_name(&canonical),
                decimals,
                chain_id: result.query.chain_id,
                token_address: result.query.token.as_ref().map(|t| t.address),
                raw_amount,
                usd_value,
            });
        }

        for account in accounts.values_mut() {
            account.total_usd = account.records.iter().map(|r| r.usd_value).sum();
        }

        let aggregated = fold_across_accounts(&accounts);
        (accounts, aggregated)
    }

    /// Resolve the USD price for one record. Protocol-derived symbols read
    /// only the instance-scoped key; a missing entry in either map is price
    /// zero, never a cross-strategy fallback.
    fn lookup_price(
        &self,
        canonical: &str,
        chain_id: u64,
        quote_prices: &HashMap<String, PriceQuote>,
        protocol_prices: &HashMap<(String, u64), PriceQuote>,
    ) -> f64 {
        match self.registry.resolve_strategy(canonical) {
            PricingStrategy::ProtocolDerived(_) => protocol_prices
                .get(&(canonical.to_string(), chain_id))
                .map(|q| q.usd_price)
                .unwrap_or(0.0),
            PricingStrategy::QuoteFeed => {
                quote_prices.get(canonical).map(|q| q.usd_price).unwrap_or(0.0)
            }
        }
    }
}

/// Fold every account's records into per-symbol totals, sorted by USD value
/// descending with symbol as the deterministic tie-break.
fn fold_across_accounts(accounts: &HashMap<Address, AccountBalances>) -> Vec<AggregatedBalance> {
    let mut by_symbol: HashMap<String, AggregatedBalance> = HashMap::new();

    for account in accounts.values() {
        for record in &account.records {
            let entry =
                by_symbol.entry(record.symbol.clone()).or_insert_with(|| AggregatedBalance {
                    symbol: record.symbol.clone(),
                    display_name: record.display_name.clone(),
                    total_raw_amount: Default::default(),
                    decimals: record.decimals,
                    total_usd: 0.0,
                });

            entry.total_raw_amount += record.raw_amount;
            entry.total_usd += record.usd_value;
            // Last-processed decimals win on cross-chain conflicts
            entry.decimals = record.decimals;
        }
    }

    let mut aggregated: Vec<AggregatedBalance> = by_symbol.into_values().collect();
    aggregated.sort_by(|a, b| {
        b.total_usd
            .partial_cmp(&a.total_usd)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    aggregated
}
