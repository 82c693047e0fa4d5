//! Cycle-scoped portfolio types.
//!
//! Everything here is created fresh by one refresh cycle, consumed by the next
//! stage, and superseded wholesale by the next cycle. Nothing is patched in
//! place.

use std::time::Instant;

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::registry::TokenDescriptor;

/// One planned balance read: an owner, a chain, and a token (`None` = native).
///
/// Uniqueness key within a plan: `(owner, chain_id, token address or None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceQuery {
    /// Owner address whose balance is read.
    pub owner: Address,
    /// Chain the read executes on.
    pub chain_id: u64,
    /// Token to read; `None` means the chain's native token.
    pub token: Option<TokenDescriptor>,
}

impl BalanceQuery {
    /// Uniqueness key for this query within one plan.
    pub fn key(&self) -> (Address, u64, Option<Address>) {
        (self.owner, self.chain_id, self.token.as_ref().map(|t| t.address))
    }
}

/// Outcome of executing one balance query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// All underlying reads succeeded and decoded.
    Success {
        /// Raw amount in the token's smallest unit.
        raw_amount: U256,
        /// Symbol as reported on-chain (or the registry's native symbol).
        symbol: String,
        /// Token decimals.
        decimals: u8,
    },
    /// The query, or the batch containing it, failed. Contributes nothing.
    Failed,
}

/// One balance query paired with its outcome. Produced exactly once per query
/// per fetch cycle, in the same order as the plan.
#[derive(Debug, Clone)]
pub struct BalanceQueryResult {
    /// The query this result answers.
    pub query: BalanceQuery,
    /// What happened.
    pub outcome: QueryOutcome,
}

impl BalanceQueryResult {
    /// Convenience constructor for a failed query.
    pub fn failed(query: BalanceQuery) -> Self {
        Self { query, outcome: QueryOutcome::Failed }
    }
}

/// A USD price with its fetch time, used for freshness checks.
#[derive(Debug, Clone, Copy)]
pub struct PriceQuote {
    /// Spot price in USD.
    pub usd_price: f64,
    /// When the price was fetched.
    pub fetched_at: Instant,
}

/// One priced balance line for one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountBalanceRecord {
    /// Canonical (lowercase) symbol.
    pub symbol: String,
    /// Human-readable token name.
    pub display_name: String,
    /// Token decimals.
    pub decimals: u8,
    /// Chain the balance lives on.
    pub chain_id: u64,
    /// Token contract address; `None` for the native token.
    pub token_address: Option<Address>,
    /// Exact raw amount in smallest units.
    pub raw_amount: U256,
    /// Display-grade USD value.
    pub usd_value: f64,
}

/// All balances of one owner for one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountBalances {
    /// Owner address.
    pub owner: Address,
    /// Priced balance records, one per successful query.
    pub records: Vec<AccountBalanceRecord>,
    /// Float sum of the records' USD values.
    pub total_usd: f64,
    /// True if any constituent query failed. Successful records are kept.
    pub has_error: bool,
}

/// Cross-account totals for one canonical symbol.
///
/// `total_raw_amount` is an exact integer sum; `total_usd` is a float sum.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedBalance {
    /// Canonical (lowercase) symbol, the cross-chain aggregation key.
    pub symbol: String,
    /// Human-readable token name.
    pub display_name: String,
    /// Exact sum of raw amounts across all accounts and chains.
    pub total_raw_amount: U256,
    /// Token decimals (last-processed value wins on cross-chain conflicts).
    pub decimals: u8,
    /// Float sum of USD values.
    pub total_usd: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_key_distinguishes_native_from_token() {
        let owner = Address::ZERO;
        let native = BalanceQuery { owner, chain_id: 1, token: None };
        let token = BalanceQuery {
            owner,
            chain_id: 1,
            token: Some(TokenDescriptor {
                chain_id: 1,
                address: Address::ZERO,
                symbol_hint: "X".to_string(),
            }),
        };
        assert_ne!(native.key(), token.key());
    }

    #[test]
    fn test_failed_result_carries_no_amount() {
        let query = BalanceQuery { owner: Address::ZERO, chain_id: 1, token: None };
        let result = BalanceQueryResult::failed(query);
        assert_eq!(result.outcome, QueryOutcome::Failed);
    }
}
