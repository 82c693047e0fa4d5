//! Balance fetcher.
//!
//! Executes one cycle's query plan: per chain, one batched round trip covering
//! every fungible-token query on that chain (three reads per query: balance,
//! symbol, decimals); per (owner, chain) pair, one native-balance read. All
//! batches and native reads run concurrently, and results are indexed back
//! into plan order so the output is positionally aligned with the plan.
//!
//! This component never retries; a fetch is a best-effort single attempt and
//! re-execution belongs to the refresh controller.

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use alloy::sol_types::SolCall;

use crate::{
    ethereum::contracts::IERC20,
    registry::Registry,
    transport::{ChainReadTransport, ReadCall, ReadOutcome},
    types::{BalanceQuery, BalanceQueryResult, QueryOutcome},
};

/// Service executing balance query plans against the chain transport.
#[derive(Clone)]
pub struct BalanceFetcher {
    transport: Arc<dyn ChainReadTransport>,
    registry: Arc<Registry>,
}

/// One concurrently-executed piece of a fetch, tagged with the plan indices
/// it answers.
enum FetchPart {
    Chain(Vec<(usize, QueryOutcome)>),
    Native(usize, QueryOutcome),
}

impl BalanceFetcher {
    /// Create a new balance fetcher.
    pub fn new(transport: Arc<dyn ChainReadTransport>, registry: Arc<Registry>) -> Self {
        Self { transport, registry }
    }

    /// Execute the plan, returning one result per query in plan order.
    ///
    /// A chain-level transport failure fails every query on that chain but
    /// leaves other chains untouched. A fungible query succeeds only if all
    /// three of its underlying reads succeed and decode.
    pub async fn fetch(&self, plan: &[BalanceQuery]) -> Vec<BalanceQueryResult> {
        // Everything starts as failed; completed parts overwrite their slots.
        let mut outcomes: Vec<QueryOutcome> = vec![QueryOutcome::Failed; plan.len()];

        // Partition the plan: fungible query indices per chain, natives apart.
        let mut fungible_by_chain: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut natives: Vec<usize> = Vec::new();
        for (idx, query) in plan.iter().enumerate() {
            match &query.token {
                Some(_) => fungible_by_chain.entry(query.chain_id).or_default().push(idx),
                None => natives.push(idx),
            }
        }

        let mut tasks = tokio::task::JoinSet::new();

        for (chain_id, indices) in fungible_by_chain {
            let transport = Arc::clone(&self.transport);
            let queries: Vec<(usize, Address, Address)> = indices
                .iter()
                .map(|&idx| {
                    let query = &plan[idx];
                    // Partitioning only selects queries with a token
                    let token = query.token.as_ref().map(|t| t.address).unwrap_or(Address::ZERO);
                    (idx, query.owner, token)
                })
                .collect();

            tasks.spawn(async move {
                FetchPart::Chain(fetch_chain_batch(transport, chain_id, queries).await)
            });
        }

        for idx in natives {
            let transport = Arc::clone(&self.transport);
            let query = &plan[idx];
            let (owner, chain_id) = (query.owner, query.chain_id);
            let native = self
                .registry
                .chain(chain_id)
                .map(|c| (c.native_symbol.clone(), c.native_decimals));

            tasks.spawn(async move {
                let Some((symbol, decimals)) = native else {
                    return FetchPart::Native(idx, QueryOutcome::Failed);
                };
                match transport.native_balance(chain_id, owner).await {
                    Ok(raw_amount) => FetchPart::Native(
                        idx,
                        QueryOutcome::Success { raw_amount, symbol, decimals },
                    ),
                    Err(err) => {
                        tracing::warn!(chain_id, owner = %owner, error = %err, "Native balance read failed");
                        FetchPart::Native(idx, QueryOutcome::Failed)
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(FetchPart::Chain(parts)) => {
                    for (idx, outcome) in parts {
                        outcomes[idx] = outcome;
                    }
                }
                Ok(FetchPart::Native(idx, outcome)) => outcomes[idx] = outcome,
                Err(err) => {
                    // The affected slots keep their failed default
                    tracing::warn!(error = %err, "Balance fetch task panicked");
                }
            }
        }

        plan.iter()
            .zip(outcomes)
            .map(|(query, outcome)| BalanceQueryResult { query: query.clone(), outcome })
            .collect()
    }
}

/// Run one chain's batched reads and decode them back to per-query outcomes.
async fn fetch_chain_batch(
    transport: Arc<dyn ChainReadTransport>,
    chain_id: u64,
    queries: Vec<(usize, Address, Address)>,
) -> Vec<(usize, QueryOutcome)> {
    let mut calls = Vec::with_capacity(queries.len() * 3);
    for &(_, owner, token) in &queries {
        calls.push(ReadCall {
            chain_id,
            target: token,
            calldata: IERC20::balanceOfCall { account: owner }.abi_encode().into(),
        });
        calls.push(ReadCall {
            chain_id,
            target: token,
            calldata: IERC20::symbolCall {}.abi_encode().into(),
        });
        calls.push(ReadCall {
            chain_id,
            target: token,
            calldata: IERC20::decimalsCall {}.abi_encode().into(),
        });
    }

    let responses = match transport.read_batch(chain_id, &calls).await {
        Ok(responses) if responses.len() == calls.len() => responses,
        Ok(responses) => {
            tracing::warn!(
                chain_id,
                expected = calls.len(),
                got = responses.len(),
                "Batch response length mismatch, failing chain"
            );
            return queries.into_iter().map(|(idx, _, _)| (idx, QueryOutcome::Failed)).collect();
        }
        Err(err) => {
            tracing::warn!(chain_id, error = %err, "Chain batch failed");
            return queries.into_iter().map(|(idx, _, _)| (idx, QueryOutcome::Failed)).collect();
        }
    };

    queries
        .into_iter()
        .zip(responses.chunks(3))
        .map(|((idx, _, _), reads)| (idx, decode_fungible(reads)))
        .collect()
}

/// Decode one fungible query's three reads. Any failed or undecodable read
/// fails the whole query; a partial decode must not fabricate a result.
fn decode_fungible(reads: &[ReadOutcome]) -> QueryOutcome {
    let [balance, symbol, decimals] = reads else {
        return QueryOutcome::Failed;
    };
    if !(balance.success && symbol.success && decimals.success) {
        return QueryOutcome::Failed;
    }

    let raw_amount = match IERC20::balanceOfCall::abi_decode_returns(&balance.data) {
        Ok(value) => value,
        Err(_) => return QueryOutcome::Failed,
    };
    let symbol = match IERC20::symbolCall::abi_decode_returns(&symbol.data) {
        Ok(value) => value,
        Err(_) => return QueryOutcome::Failed,
    };
    let decimals = match IERC20::decimalsCall::abi_decode_returns(&decimals.data) {
        Ok(value) => value,
        Err(_) => return QueryOutcome::Failed,
    };

    QueryOutcome::Success { raw_amount, symbol, decimals }
}
