//! Multi-chain RPC client.

use std::{collections::HashMap, sync::Arc};

use alloy::{
    network::Ethereum,
    providers::{Provider, ProviderBuilder, RootProvider},
};

use crate::error::{AppError, Result};

/// Type alias for the HTTP provider.
pub type HttpProvider = RootProvider<Ethereum>;

/// RPC client holding one HTTP provider per registered chain.
#[derive(Clone)]
pub struct EvmClient {
    providers: HashMap<u64, Arc<HttpProvider>>,
}

impl EvmClient {
    /// Create a client from a chain id → RPC URL map.
    ///
    /// Note: this does NOT make any network calls. Connections are
    /// established lazily when the first read is performed.
    pub fn new(rpc_urls: &HashMap<u64, String>) -> Result<Self> {
        let mut providers = HashMap::new();

        for (&chain_id, rpc_url) in rpc_urls {
            let url = rpc_url
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid RPC URL: {}", rpc_url)))?;

            let provider = ProviderBuilder::new().connect_http(url).root().clone();

            tracing::info!(chain_id, rpc_url = %rpc_url, "EVM provider created (lazy initialization)");
            providers.insert(chain_id, Arc::new(provider));
        }

        Ok(Self { providers })
    }

    /// Get the provider for a chain.
    pub fn provider(&self, chain_id: u64) -> Result<&Arc<HttpProvider>> {
        self.providers.get(&chain_id).ok_or(AppError::UnknownChain(chain_id))
    }
}
