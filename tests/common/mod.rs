//! Shared mock transports and fixtures for integration tests.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use alloy::primitives::{Address, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use chainfolio::{
    error::{AppError, Result},
    ethereum::contracts::{IERC20, IYearnVault},
    registry::{ChainDescriptor, PricingStrategy, Registry, TokenDescriptor},
    transport::{ChainReadTransport, QuoteFeedTransport, ReadCall, ReadOutcome},
};

/// Scriptable chain transport: answers ERC-20 and vault reads from tables,
/// with per-chain failure switches and a configurable response delay.
#[derive(Default)]
pub struct MockChain {
    /// (chain_id, token, owner) -> raw balance
    pub balances: Mutex<HashMap<(u64, Address, Address), U256>>,
    /// (chain_id, token) -> symbol
    pub symbols: Mutex<HashMap<(u64, Address), String>>,
    /// (chain_id, token) -> decimals
    pub decimals: Mutex<HashMap<(u64, Address), u8>>,
    /// (chain_id, owner) -> native balance
    pub natives: Mutex<HashMap<(u64, Address), U256>>,
    /// (chain_id, vault) -> pricePerShare
    pub price_per_share: Mutex<HashMap<(u64, Address), U256>>,
    /// Chains whose batches and native reads fail wholesale
    pub fail_chains: Mutex<HashSet<u64>>,
    /// Artificial latency applied to every transport call, in milliseconds
    pub delay_ms: AtomicU64,
    /// Number of read_batch calls served
    pub batch_calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, chain_id: u64, token: Address, owner: Address, raw: U256) {
        self.balances.lock().unwrap().insert((chain_id, token, owner), raw);
    }

    pub fn set_token_meta(&self, chain_id: u64, token: Address, symbol: &str, decimals: u8) {
        self.symbols.lock().unwrap().insert((chain_id, token), symbol.to_string());
        self.decimals.lock().unwrap().insert((chain_id, token), decimals);
    }

    pub fn set_native(&self, chain_id: u64, owner: Address, raw: U256) {
        self.natives.lock().unwrap().insert((chain_id, owner), raw);
    }

    pub fn set_price_per_share(&self, chain_id: u64, vault: Address, raw: U256) {
        self.price_per_share.lock().unwrap().insert((chain_id, vault), raw);
    }

    pub fn fail_chain(&self, chain_id: u64) {
        self.fail_chains.lock().unwrap().insert(chain_id);
    }

    pub fn heal_chain(&self, chain_id: u64) {
        self.fail_chains.lock().unwrap().remove(&chain_id);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn apply_delay(&self) {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn answer(&self, chain_id: u64, call: &ReadCall) -> ReadOutcome {
        let selector = &call.calldata[..4];

        if selector == IERC20::balanceOfCall::SELECTOR.as_slice() {
            let Ok(decoded) = IERC20::balanceOfCall::abi_decode(&call.calldata) else {
                return ReadOutcome::failure();
            };
            match self.balances.lock().unwrap().get(&(chain_id, call.target, decoded.account)) {
                Some(raw) => ReadOutcome { success: true, data: raw.abi_encode().into() },
                None => ReadOutcome { success: true, data: U256::ZERO.abi_encode().into() },
            }
        } else if selector == IERC20::symbolCall::SELECTOR.as_slice() {
            match self.symbols.lock().unwrap().get(&(chain_id, call.target)) {
                Some(symbol) => ReadOutcome { success: true, data: symbol.abi_encode().into() },
                None => ReadOutcome::failure(),
            }
        } else if selector == IERC20::decimalsCall::SELECTOR.as_slice() {
            match self.decimals.lock().unwrap().get(&(chain_id, call.target)) {
                Some(decimals) => ReadOutcome {
                    success: true,
                    data: IERC20::decimalsCall::abi_encode_returns(decimals).into(),
                },
                None => ReadOutcome::failure(),
            }
        } else if selector == IYearnVault::pricePerShareCall::SELECTOR.as_slice() {
            match self.price_per_share.lock().unwrap().get(&(chain_id, call.target)) {
                Some(raw) => ReadOutcome { success: true, data: raw.abi_encode().into() },
                None => ReadOutcome::failure(),
            }
        } else {
            ReadOutcome::failure()
        }
    }
}

#[async_trait]
impl ChainReadTransport for MockChain {
    async fn read_batch(&self, chain_id: u64, calls: &[ReadCall]) -> Result<Vec<ReadOutcome>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;

        if self.fail_chains.lock().unwrap().contains(&chain_id) {
            return Err(AppError::Transport(format!("chain {chain_id} unreachable")));
        }

        Ok(calls.iter().map(|call| self.answer(chain_id, call)).collect())
    }

    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256> {
        self.apply_delay().await;

        if self.fail_chains.lock().unwrap().contains(&chain_id) {
            return Err(AppError::Transport(format!("chain {chain_id} unreachable")));
        }

        Ok(self
            .natives
            .lock()
            .unwrap()
            .get(&(chain_id, owner))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}

/// Scriptable quote feed with a call counter.
#[derive(Default)]
pub struct MockFeed {
    pub prices: Mutex<HashMap<String, f64>>,
    pub calls: AtomicUsize,
}

impl MockFeed {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: Mutex::new(prices.iter().map(|(s, p)| (s.to_string(), *p)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }
}

#[async_trait]
impl QuoteFeedTransport for MockFeed {
    async fn usd_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prices = self.prices.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| prices.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }
}

/// Two-chain test registry: chain 1 and chain 2, one tracked token each.
pub fn two_chain_registry(token_a: Address, token_b: Address) -> Registry {
    Registry::new(
        vec![
            ChainDescriptor {
                id: 1,
                name: "Alpha".to_string(),
                native_symbol: "ETH".to_string(),
                native_decimals: 18,
            },
            ChainDescriptor {
                id: 2,
                name: "Beta".to_string(),
                native_symbol: "ETH".to_string(),
                native_decimals: 18,
            },
        ],
        vec![
            TokenDescriptor { chain_id: 1, address: token_a, symbol_hint: "USDX".to_string() },
            TokenDescriptor { chain_id: 2, address: token_b, symbol_hint: "USDX".to_string() },
        ],
        HashMap::new(),
        HashMap::new(),
    )
    .unwrap()
}

/// Build an engine over mocks with a short price freshness window.
pub fn build_engine(
    registry: Registry,
    owners: Vec<Address>,
    chain: std::sync::Arc<MockChain>,
    feed: std::sync::Arc<MockFeed>,
) -> std::sync::Arc<chainfolio::PortfolioEngine> {
    std::sync::Arc::new(chainfolio::PortfolioEngine::new(
        owners,
        std::sync::Arc::new(registry),
        chain,
        feed,
        std::sync::Arc::new(chainfolio::ProtocolRegistry::with_defaults()),
    ))
}

/// Single-chain registry tracking one token, with an optional strategy table.
pub fn one_chain_registry(
    token: Address,
    strategies: HashMap<String, PricingStrategy>,
) -> Registry {
    Registry::new(
        vec![ChainDescriptor {
            id: 1,
            name: "Alpha".to_string(),
            native_symbol: "ETH".to_string(),
            native_decimals: 18,
        }],
        vec![TokenDescriptor { chain_id: 1, address: token, symbol_hint: "USDX".to_string() }],
        strategies,
        HashMap::new(),
    )
    .unwrap()
}
