//! Protocol-derived pricing.
//!
//! Quote-feed prices are symbol-scoped; protocol prices are chain/instance
//! scoped, read from the token contract itself. Each protocol registers a
//! pricer that knows how to build its read and decode the result. The
//! registration map is resolved once at startup, no runtime reflection.

use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::{
    ethereum::contracts::IYearnVault,
    registry::ProtocolId,
    transport::ReadCall,
};

/// A distinct token instance that needs a protocol-derived price.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenInstance {
    /// Canonical symbol.
    pub symbol: String,
    /// Chain the contract lives on.
    pub chain_id: u64,
    /// Token contract address.
    pub address: Address,
    /// Token decimals, used for exchange-rate scaling.
    pub decimals: u8,
}

/// Strategy-pattern extension point for protocol pricing.
///
/// New protocols implement this pair and register under their [`ProtocolId`].
pub trait ProtocolPricer: Send + Sync {
    /// Build the on-chain read for one token instance.
    fn build_read(&self, instance: &TokenInstance) -> ReadCall;

    /// Decode the read's return data into a USD-equivalent price.
    ///
    /// `None` means the read did not decode; the instance then simply has no
    /// price this cycle.
    fn decode(&self, instance: &TokenInstance, data: &[u8]) -> Option<f64>;
}

/// Yearn vault pricer: `pricePerShare()` scaled by the vault's own decimals.
pub struct YearnPricer;

impl ProtocolPricer for YearnPricer {
    fn build_read(&self, instance: &TokenInstance) -> ReadCall {
        ReadCall {
            chain_id: instance.chain_id,
            target: instance.address,
            calldata: IYearnVault::pricePerShareCall {}.abi_encode().into(),
        }
    }

    fn decode(&self, instance: &TokenInstance, data: &[u8]) -> Option<f64> {
        let raw = IYearnVault::pricePerShareCall::abi_decode_returns(data).ok()?;
        // pricePerShare obeys the vault's decimals
        let value = Decimal::from_str_exact(&raw.to_string()).ok()?;
        let scale = Decimal::from(10i64.checked_pow(instance.decimals as u32)?);
        (value / scale).to_f64()
    }
}

/// Map from protocol id to its pricer, populated once at startup.
pub struct ProtocolRegistry {
    pricers: HashMap<ProtocolId, Arc<dyn ProtocolPricer>>,
}

impl ProtocolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self { pricers: HashMap::new() }
    }

    /// Registry with all built-in protocols registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ProtocolId::Yearn, Arc::new(YearnPricer));
        registry
    }

    /// Register a pricer for a protocol.
    pub fn register(&mut self, id: ProtocolId, pricer: Arc<dyn ProtocolPricer>) {
        self.pricers.insert(id, pricer);
    }

    /// Look up the pricer for a protocol.
    pub fn get(&self, id: ProtocolId) -> Option<&Arc<dyn ProtocolPricer>> {
        self.pricers.get(&id)
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
