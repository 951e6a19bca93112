//! Shared fakes for swap-quoter integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::TxLegacy;
use alloy::primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use swap_quoter::chain::{ChainClient, SwapCall, TxOutcome};
use swap_quoter::data_management::cache::PriceCache;
use swap_quoter::data_management::price_source::PriceSource;
use swap_quoter::signer::{LocalKeyStore, SignerRef};
use swap_quoter::types::{Result, SwapError};
use swap_quoter::SwapEngine;

// First well-known development account.
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_WALLET: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub const ROUTER: Address = address!("eE567Fe1712Faf6149d80dA1E6934E354124CfE3");
pub const WETH: Address = address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14");
pub const TKA: Address = address!("a00000000000000000000000000000000000000a");
pub const TKB: Address = address!("b00000000000000000000000000000000000000b");

pub const APPROVAL_HASH: B256 = B256::repeat_byte(0xaa);
pub const SWAP_HASH: B256 = B256::repeat_byte(0xbb);
pub const SWAP_GAS: u64 = 121_000;

pub fn dev_keys() -> LocalKeyStore {
    LocalKeyStore::from_toml(&format!("[keys]\ndev = \"{DEV_KEY}\"\n")).unwrap()
}

/// Fixed USD prices, counting upstream calls. Unknown ids fail.
#[derive(Default)]
pub struct StaticPrices {
    prices: HashMap<String, Decimal>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl StaticPrices {
    pub fn new(prices: &[(&str, Decimal)]) -> Self {
        Self {
            prices: prices.iter().map(|(id, p)| (id.to_string(), *p)).collect(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn fetch(&self, token_id: &str) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.prices
            .get(token_id)
            .copied()
            .ok_or_else(|| SwapError::price_unavailable(token_id, std::io::Error::other("unknown token id")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    Approve { token: Address, spender: Address, amount: U256, from: Address },
    Quote { amount_in: U256, path: Vec<Address> },
    Swap(SwapCall),
}

/// In-memory chain that records every call in order.
pub struct MockChain {
    pub balance: U256,
    pub allowance: U256,
    pub amounts_out: Result<Vec<U256>>,
    pub approve_error: Option<SwapError>,
    pub calls: Mutex<Vec<ChainCall>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            balance: U256::from(1_000_000u64),
            allowance: U256::ZERO,
            amounts_out: Ok(vec![U256::from(1000u64), U256::from(4000u64), U256::from(1000u64)]),
            approve_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ChainCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn router(&self) -> Address {
        ROUTER
    }

    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256> {
        Ok(self.balance)
    }

    async fn allowance(&self, _token: Address, _owner: Address, spender: Address) -> Result<U256> {
        assert_eq!(spender, ROUTER);
        Ok(self.allowance)
    }

    async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        self.record(ChainCall::Quote { amount_in, path: path.to_vec() });
        self.amounts_out.clone()
    }

    async fn approve(&self, signer: SignerRef<'_>, token: Address, spender: Address, amount: U256) -> Result<TxOutcome> {
        // Signing goes through the key store just like the real adapter.
        signer.keys.sign(signer.key_id, TxLegacy { chain_id: Some(11_155_111), ..Default::default() }).await?;
        self.record(ChainCall::Approve { token, spender, amount, from: signer.address });
        match &self.approve_error {
            Some(err) => Err(err.clone()),
            None => Ok(TxOutcome { tx_hash: APPROVAL_HASH, gas_used: 46_000 }),
        }
    }

    async fn swap_exact_tokens_for_tokens(&self, _signer: SignerRef<'_>, call: SwapCall) -> Result<TxOutcome> {
        self.record(ChainCall::Swap(call));
        Ok(TxOutcome { tx_hash: SWAP_HASH, gas_used: SWAP_GAS })
    }
}

pub fn engine_with(prices: Arc<StaticPrices>, chain: Arc<MockChain>) -> SwapEngine {
    SwapEngine::new(Arc::new(PriceCache::new()), prices, chain, Arc::new(dev_keys()), WETH)
}
