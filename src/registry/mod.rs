//! Static chain/token registry.
//!
//! The registry is the read-only configuration collaborator: the supported
//! chains, each chain's native token descriptor, the fungible tokens to track
//! per chain, the pricing strategy table, and the symbol display names. It is
//! loaded once at startup and validated there; malformed entries are fatal.

use std::collections::HashMap;

use alloy::primitives::{address, Address};

use crate::error::{AppError, Result};

/// A supported network.
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    /// Chain id (e.g., 1 for Ethereum Mainnet).
    pub id: u64,
    /// Human-readable network name.
    pub name: String,
    /// Symbol of the chain's native token.
    pub native_symbol: String,
    /// Decimals of the chain's native token.
    pub native_decimals: u8,
}

/// A fungible token to track on one chain.
///
/// The native token is never modeled as a `TokenDescriptor`; queries carry
/// `Option<TokenDescriptor>` and `None` means "native token of the chain".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    /// Chain the contract lives on.
    pub chain_id: u64,
    /// Token contract address.
    pub address: Address,
    /// Static symbol hint used for logging before the on-chain symbol is read.
    pub symbol_hint: String,
}

/// Identifier of a protocol whose tokens are priced from an on-chain read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    /// Yearn vaults, priced via `pricePerShare()`.
    Yearn,
}

/// How a canonical symbol gets its USD price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingStrategy {
    /// Batched off-chain quote feed, keyed by symbol only.
    QuoteFeed,
    /// On-chain exchange rate specific to the protocol and contract instance.
    ProtocolDerived(ProtocolId),
}

/// Static registry of chains, tokens, pricing strategies, and display names.
pub struct Registry {
    chains: Vec<ChainDescriptor>,
    tokens_by_chain: HashMap<u64, Vec<TokenDescriptor>>,
    strategies: HashMap<String, PricingStrategy>,
    display_names: HashMap<String, String>,
}

impl Registry {
    /// Build and validate a registry.
    ///
    /// Fails with [`AppError::Config`] on duplicate chain ids, duplicate
    /// `(chain_id, address)` token entries, or a token referencing a chain
    /// that is not registered.
    pub fn new(
        chains: Vec<ChainDescriptor>,
        tokens: Vec<TokenDescriptor>,
        strategies: HashMap<String, PricingStrategy>,
        display_names: HashMap<String, String>,
    ) -> Result<Self> {
        let mut seen_chains = HashMap::new();
        for chain in &chains {
            if seen_chains.insert(chain.id, ()).is_some() {
                return Err(AppError::Config(format!("Duplicate chain id: {}", chain.id)));
            }
        }

        let mut tokens_by_chain: HashMap<u64, Vec<TokenDescriptor>> = HashMap::new();
        let mut seen_tokens = HashMap::new();
        for token in tokens {
            if !seen_chains.contains_key(&token.chain_id) {
                return Err(AppError::Config(format!(
                    "Token {} references unknown chain id {}",
                    token.address, token.chain_id
                )));
            }
            if seen_tokens.insert((token.chain_id, token.address), ()).is_some() {
                return Err(AppError::Config(format!(
                    "Duplicate token entry: {} on chain {}",
                    token.address, token.chain_id
                )));
            }
            tokens_by_chain.entry(token.chain_id).or_default().push(token);
        }

        Ok(Self { chains, tokens_by_chain, strategies, display_names })
    }

    /// Supported chains, in configured order.
    pub fn chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    /// Look up a chain descriptor by id.
    pub fn chain(&self, chain_id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.id == chain_id)
    }

    /// Tracked fungible tokens on one chain, in configured order.
    pub fn tokens_on(&self, chain_id: u64) -> &[TokenDescriptor] {
        self.tokens_by_chain.get(&chain_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve the pricing strategy for a canonical symbol.
    ///
    /// Pure table lookup; symbols not in the table default to the quote feed.
    pub fn resolve_strategy(&self, canonical_symbol: &str) -> PricingStrategy {
        self.strategies.get(canonical_symbol).copied().unwrap_or(PricingStrategy::QuoteFeed)
    }

    /// Display name for a canonical symbol, falling back to the symbol itself.
    pub fn display_name(&self, canonical_symbol: &str) -> String {
        self.display_names
            .get(canonical_symbol)
            .cloned()
            .unwrap_or_else(|| canonical_symbol.to_string())
    }

    /// The registry used by the live deployment: Ethereum, Arbitrum, and Base,
    /// tracking USDC and USDT on each, with Yearn vault shares priced on-chain.
    pub fn default_mainnet() -> Result<Self> {
        let chains = vec![
            ChainDescriptor {
                id: 1,
                name: "Ethereum".to_string(),
                native_symbol: "ETH".to_string(),
                native_decimals: 18,
            },
            ChainDescriptor {
                id: 42161,
                name: "Arbitrum".to_string(),
                native_symbol: "ETH".to_string(),
                native_decimals: 18,
            },
            ChainDescriptor {
                id: 8453,
                name: "Base".to_string(),
                native_symbol: "ETH".to_string(),
                native_decimals: 18,
            },
        ];

        let tokens = vec![
            // USDC
            token(1, address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), "USDC"),
            token(42161, address!("af88d065e77c8cC2239327C5EDb3A432268e5831"), "USDC"),
            token(8453, address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), "USDC"),
            // USDT
            token(1, address!("dAC17F958D2ee523a2206206994597C13D831ec7"), "USDT"),
            token(42161, address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), "USDT"),
            token(8453, address!("fde4C96c8593536E31F229EA8f37b2ADa2699bb2"), "USDT"),
        ];

        let mut strategies = HashMap::new();
        strategies.insert("yvusdt".to_string(), PricingStrategy::ProtocolDerived(ProtocolId::Yearn));

        let mut display_names = HashMap::new();
        display_names.insert("eth".to_string(), "Ethereum".to_string());
        display_names.insert("usdc".to_string(), "USD Coin".to_string());
        display_names.insert("usdt".to_string(), "Tether USD".to_string());
        display_names.insert("weth".to_string(), "Wrapped Ether".to_string());

        Self::new(chains, tokens, strategies, display_names)
    }
}

fn token(chain_id: u64, address: Address, symbol_hint: &str) -> TokenDescriptor {
    TokenDescriptor { chain_id, address, symbol_hint: symbol_hint.to_string() }
}
