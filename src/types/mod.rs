//! Shared data types for the aggregation pipeline.

pub mod portfolio;
pub mod units;

pub use portfolio::{
    AccountBalanceRecord, AccountBalances, AggregatedBalance, BalanceQuery, BalanceQueryResult,
    PriceQuote, QueryOutcome,
};
pub use units::{format_units, u256_to_f64};
