pub mod execution;
pub mod pricing;
pub mod quoting;

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::chain::{ChainClient, EvmChain};
use crate::config::AppConfig;
use crate::data_management::cache::{CacheMetrics, PriceCache};
use crate::data_management::price_source::{CoinGeckoSource, PriceSource};
use crate::signer::{LocalKeyStore, SigningKeys};
use crate::types::{ExecutionResult, PriceQuote, Result, SwapIntent, SwapQuote, TokenId};
use crate::utils::retry::BackoffConfig;
use execution::SwapExecutor;
use pricing::PriceService;

/// A priced swap between two provider token ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuoteResponse {
    pub input_token: TokenId,
    pub output_token: TokenId,
    pub quote: SwapQuote,
}

/// Entry point shared by the HTTP server and the CLI.
///
/// Owns the price cache (through [`PriceService`]), the chain adapter and the
/// two-leg swap executor. Nothing here is global; every binary builds its own.
pub struct SwapEngine {
    prices: PriceService,
    chain: Arc<dyn ChainClient>,
    executor: SwapExecutor,
}

impl SwapEngine {
    pub fn new(
        cache: Arc<PriceCache>,
        source: Arc<dyn PriceSource>,
        chain: Arc<dyn ChainClient>,
        keys: Arc<dyn SigningKeys>,
        intermediate_token: Address,
    ) -> Self {
        let executor = SwapExecutor::new(Arc::clone(&chain), keys, intermediate_token);
        Self { prices: PriceService::new(cache, source), chain, executor }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let cache = Arc::new(PriceCache::with_settings(config.price_cache_ttl, config.price_cache_capacity));
        let source = CoinGeckoSource::new(
            config.price_api_url.clone(),
            config.price_api_key.clone(),
            config.price_timeout,
            BackoffConfig::new(config.price_fetch_retries),
        )
        .context("price provider client")?;
        let chain = EvmChain::from_config(config).context("chain client")?;

        let keys = match &config.keystore_file {
            Some(path) => LocalKeyStore::from_file(path)?,
            None => {
                warn!("no keystore configured, swap execution will reject every key id");
                LocalKeyStore::empty()
            }
        };
        info!(
            rpc = %config.rpc_url,
            chain_id = config.chain_id,
            router = %config.router_address,
            keys = keys.len(),
            "swap engine ready"
        );

        Ok(Self::new(cache, Arc::new(source), Arc::new(chain), Arc::new(keys), config.intermediate_token))
    }

    #[instrument(skip(self))]
    pub async fn price(&self, token_id: &str) -> Result<PriceQuote> {
        self.prices.price(token_id).await
    }

    /// Prices `amount` of `input_token` in `output_token`. The amount is
    /// checked before either price is looked up.
    #[instrument(skip(self))]
    pub async fn calculate_swap(&self, input_token: &str, output_token: &str, amount: Decimal) -> Result<SwapQuoteResponse> {
        quoting::validate_amount(amount)?;
        let (input_price, output_price) = self.price_pair(input_token, output_token).await?;
        let quote = quoting::quote(amount, input_price, output_price)?;
        Ok(SwapQuoteResponse {
            input_token: input_token.to_string(),
            output_token: output_token.to_string(),
            quote,
        })
    }

    #[instrument(skip(self))]
    pub async fn price_impact(&self, input_token: &str, output_token: &str, amount: Decimal) -> Result<Decimal> {
        quoting::validate_amount(amount)?;
        let (input_price, output_price) = self.price_pair(input_token, output_token).await?;
        quoting::price_impact(amount, input_price, output_price)
    }

    #[instrument(skip(self, intent), fields(key_id = %intent.key_id))]
    pub async fn execute_swap(&self, intent: SwapIntent) -> Result<ExecutionResult> {
        let result = self.executor.execute(intent).await?;
        info!(swap_tx = %result.swap_tx_hash, gas_used = result.gas_used, "swap confirmed");
        Ok(result)
    }

    /// Amount of `token` the router may currently spend on behalf of `wallet`.
    #[instrument(skip(self))]
    pub async fn allowance(&self, token: Address, wallet: Address) -> Result<U256> {
        self.chain.allowance(token, wallet, self.chain.router()).await
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.prices.cache().metrics()
    }

    // Input price first, then output.
    async fn price_pair(&self, input_token: &str, output_token: &str) -> Result<(Decimal, Decimal)> {
        let input = self.prices.price(input_token).await?;
        let output = self.prices.price(output_token).await?;
        Ok((input.price_usd(), output.price_usd()))
    }
}
