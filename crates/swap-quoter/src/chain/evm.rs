//! [`ChainClient`] over JSON-RPC using alloy.

use std::time::Duration;

use alloy::consensus::TxLegacy;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy::transports::http::Http;
use async_trait::async_trait;
use alloy::transports::http::reqwest::{Client, Url};
use tracing::{debug, info, warn};

use super::contracts::{IUniswapV2Router02, IERC20};
use super::{classify_contract_error, classify_rpc_error, ChainClient, SwapCall, TxOutcome};
use crate::config::AppConfig;
use crate::signer::SignerRef;
use crate::types::{ErrorKind, Result, SwapError};
use crate::utils::retry::{with_backoff, BackoffConfig};

const RPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
// Headroom over the node's gas estimate, in percent.
const GAS_LIMIT_BUFFER_PCT: u64 = 20;

pub struct EvmChain {
    provider: RootProvider,
    chain_id: u64,
    router: Address,
    receipt_timeout: Duration,
    receipt_poll: Duration,
    read_backoff: BackoffConfig,
}

impl EvmChain {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = provider_for_url(&config.rpc_url, config.rpc_timeout)?;
        Ok(Self {
            provider,
            chain_id: config.chain_id,
            router: config.router_address,
            receipt_timeout: config.receipt_timeout,
            receipt_poll: config.receipt_poll_interval,
            read_backoff: BackoffConfig::default(),
        })
    }

    /// Gas price and nonce reads are idempotent and safe to retry.
    async fn read_with_retry<T, F, Fut>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        with_backoff(&self.read_backoff, label, |e: &SwapError| e.kind() == ErrorKind::ChainUnavailable, op).await
    }

    /// estimate gas → gas price → nonce → build → sign → broadcast → receipt.
    ///
    /// Broadcast is never retried: a duplicate would either be dropped for
    /// the reused nonce or, with a fresh one, execute twice.
    async fn submit(&self, signer: SignerRef<'_>, to: Address, input: Bytes, label: &str) -> Result<TxOutcome> {
        let from = signer.address;
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(input.clone());

        let estimate = self.provider.estimate_gas(request).await.map_err(|e| classify_rpc_error(&e))?;
        let gas_limit = estimate.saturating_mul(100 + GAS_LIMIT_BUFFER_PCT) / 100;

        let gas_price = self
            .read_with_retry("gas price", || async {
                self.provider.get_gas_price().await.map_err(|e| classify_rpc_error(&e))
            })
            .await?;
        let nonce = self
            .read_with_retry("nonce", || async {
                self.provider
                    .get_transaction_count(from)
                    .pending()
                    .await
                    .map_err(|e| classify_rpc_error(&e))
            })
            .await?;
        debug!(%label, %from, nonce, gas_limit, gas_price, "built transaction");

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input,
        };
        let envelope = signer.keys.sign(signer.key_id, tx).await?;
        let raw = envelope.encoded_2718();

        let pending = self.provider.send_raw_transaction(&raw).await.map_err(|e| classify_rpc_error(&e))?;
        let tx_hash = *pending.tx_hash();
        info!(%label, %tx_hash, "transaction broadcast");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status() {
            return Err(SwapError::TransactionReverted(format!("{label} transaction {tx_hash} reverted")));
        }
        info!(%label, %tx_hash, gas_used = receipt.gas_used, "transaction mined");
        Ok(TxOutcome { tx_hash, gas_used: receipt.gas_used })
    }

    /// Poll until the receipt shows up. Failed lookups are logged and polled
    /// again; only the overall wait is bounded, by `receipt_timeout`.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => warn!(%tx_hash, "receipt lookup failed: {}", e),
                }
                tokio::time::sleep(self.receipt_poll).await;
            }
        };
        tokio::time::timeout(self.receipt_timeout, poll).await.map_err(|_| {
            SwapError::ChainUnavailable(format!(
                "no receipt for {tx_hash} after {}s",
                self.receipt_timeout.as_secs()
            ))
        })
    }
}

fn provider_for_url(url: &str, timeout: Duration) -> Result<RootProvider> {
    let url: Url = url
        .parse()
        .map_err(|e| SwapError::Validation(format!("invalid rpc url {url}: {e}")))?;
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(RPC_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| SwapError::ChainUnavailable(format!("cannot build rpc client: {e}")))?;
    let http = Http::with_client(client, url);
    Ok(RootProvider::new(RpcClient::new(http, false)))
}

#[async_trait]
impl ChainClient for EvmChain {
    fn router(&self) -> Address {
        self.router
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        IERC20::new(token, &self.provider)
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        IERC20::new(token, &self.provider)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        IUniswapV2Router02::new(self.router, &self.provider)
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .map_err(|e| classify_contract_error(&e))
    }

    async fn approve(&self, signer: SignerRef<'_>, token: Address, spender: Address, amount: U256) -> Result<TxOutcome> {
        let input = IERC20::approveCall { spender, amount }.abi_encode();
        self.submit(signer, token, Bytes::from(input), "approve").await
    }

    async fn swap_exact_tokens_for_tokens(&self, signer: SignerRef<'_>, call: SwapCall) -> Result<TxOutcome> {
        let input = IUniswapV2Router02::swapExactTokensForTokensCall {
            amountIn: call.amount_in,
            amountOutMin: call.min_amount_out,
            path: call.path,
            to: call.recipient,
            deadline: U256::from(call.deadline),
        }
        .abi_encode();
        self.submit(signer, self.router, Bytes::from(input), "swap").await
    }
}
