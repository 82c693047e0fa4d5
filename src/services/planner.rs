//! Query planner.
//!
//! Turns a set of owner addresses plus the registry into the flat, ordered
//! list of balance queries for one cycle. The balance fetcher's result vector
//! is positionally matched back to this plan, so the ordering here is part of
//! the contract: owner-major, chain-minor, token-minor, native query first on
//! each chain.

use alloy::primitives::Address;

use crate::{registry::Registry, types::BalanceQuery};

/// Build the balance query plan for the given owners.
///
/// Empty `owners` yields an empty plan. No two queries share a uniqueness key
/// (the registry rejects duplicate token entries at startup).
pub fn plan(owners: &[Address], registry: &Registry) -> Vec<BalanceQuery> {
    let mut queries = Vec::new();

    for &owner in owners {
        for chain in registry.chains() {
            queries.push(BalanceQuery { owner, chain_id: chain.id, token: None });

            for token in registry.tokens_on(chain.id) {
                queries.push(BalanceQuery {
                    owner,
                    chain_id: chain.id,
                    token: Some(token.clone()),
                });
            }
        }
    }

    tracing::debug!(owners = owners.len(), queries = queries.len(), "Planned balance queries");
    queries
}
