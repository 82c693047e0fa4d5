//! Transport abstractions for chain reads and off-chain quotes.
//!
//! The balance fetcher and the protocol price fetcher are both clients of
//! [`ChainReadTransport`]; the quote price fetcher is a client of
//! [`QuoteFeedTransport`]. Traits keep the fetchers testable against mock
//! implementations.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::error::Result;

/// One encoded contract read.
#[derive(Debug, Clone)]
pub struct ReadCall {
    /// Chain to execute on.
    pub chain_id: u64,
    /// Contract to call.
    pub target: Address,
    /// ABI-encoded calldata.
    pub calldata: Bytes,
}

/// Outcome of one read inside a batch. A failed read is data, not an error:
/// it degrades only the query it answers.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    /// Whether the call succeeded.
    pub success: bool,
    /// Raw return data (empty on failure).
    pub data: Bytes,
}

impl ReadOutcome {
    /// A failed read with no return data.
    pub fn failure() -> Self {
        Self { success: false, data: Bytes::new() }
    }
}

/// Batched read access to the chains.
#[async_trait]
pub trait ChainReadTransport: Send + Sync {
    /// Execute a batch of reads on one chain in a single round trip.
    ///
    /// The result has the same length and order as `calls`. Individual call
    /// failures are reported in-band; an `Err` means the whole batch failed
    /// at the transport level.
    async fn read_batch(&self, chain_id: u64, calls: &[ReadCall]) -> Result<Vec<ReadOutcome>>;

    /// Read the native balance of one owner on one chain.
    ///
    /// Native balances have no generic contract to batch through, so this is
    /// a single read per (owner, chain) pair.
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256>;
}

/// Batched access to an off-chain USD quote source.
#[async_trait]
pub trait QuoteFeedTransport: Send + Sync {
    /// Fetch USD prices for a set of canonical symbols in one request.
    ///
    /// Symbols the source does not know are omitted from the map; downstream
    /// treats a missing symbol as price zero.
    async fn usd_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>>;
}
