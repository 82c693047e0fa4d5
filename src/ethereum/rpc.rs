//! Multicall3-backed chain read transport.

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use async_trait::async_trait;

use crate::{
    error::Result,
    ethereum::{
        contracts::{IMulticall3, MULTICALL3_ADDRESS},
        EvmClient,
    },
    transport::{ChainReadTransport, ReadCall, ReadOutcome},
};

/// [`ChainReadTransport`] implementation that batches all reads for one chain
/// into a single Multicall3 `aggregate3` round trip.
#[derive(Clone)]
pub struct RpcReadTransport {
    client: EvmClient,
}

impl RpcReadTransport {
    /// Create a new transport over the given client.
    pub fn new(client: EvmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChainReadTransport for RpcReadTransport {
    async fn read_batch(&self, chain_id: u64, calls: &[ReadCall]) -> Result<Vec<ReadOutcome>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.client.provider(chain_id)?;
        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, provider.clone());

        let batch: Vec<IMulticall3::Call3> = calls
            .iter()
            .map(|call| IMulticall3::Call3 {
                target: call.target,
                allowFailure: true,
                callData: call.calldata.clone(),
            })
            .collect();

        let responses = multicall.aggregate3(batch).call().await?;

        tracing::debug!(chain_id, calls = calls.len(), "aggregate3 batch complete");

        Ok(responses
            .into_iter()
            .map(|r| ReadOutcome { success: r.success, data: r.returnData })
            .collect())
    }

    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256> {
        let provider = self.client.provider(chain_id)?;
        let balance = provider.get_balance(owner).await?;
        Ok(balance)
    }
}
