//! Common types, error handling, data models.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Provider-specific token name used for price lookups (e.g. `ethereum`).
pub type TokenId = String;

/// Default slippage tolerance: 50 bps = 0.5 %.
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Common error type for the swap-quoter system.
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    #[error("{0}")]
    Validation(String),
    #[error("Failed to fetch token price")]
    PriceUnavailable {
        token_id: TokenId,
        #[source]
        cause: Arc<dyn StdError + Send + Sync>,
    },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),
    #[error("insufficient allowance: {0}")]
    InsufficientAllowance(String),
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),
}

/// Stable, payload-free name of a [`SwapError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    PriceUnavailable,
    InvalidAmount,
    InvalidPrice,
    ChainUnavailable,
    InsufficientAllowance,
    InsufficientBalance,
    TransactionReverted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::PriceUnavailable => "PriceUnavailable",
            ErrorKind::InvalidAmount => "InvalidAmount",
            ErrorKind::InvalidPrice => "InvalidPrice",
            ErrorKind::ChainUnavailable => "ChainUnavailable",
            ErrorKind::InsufficientAllowance => "InsufficientAllowance",
            ErrorKind::InsufficientBalance => "InsufficientBalance",
            ErrorKind::TransactionReverted => "TransactionReverted",
        };
        f.write_str(name)
    }
}

impl SwapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::Validation(_) => ErrorKind::Validation,
            SwapError::PriceUnavailable { .. } => ErrorKind::PriceUnavailable,
            SwapError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            SwapError::InvalidPrice(_) => ErrorKind::InvalidPrice,
            SwapError::ChainUnavailable(_) => ErrorKind::ChainUnavailable,
            SwapError::InsufficientAllowance(_) => ErrorKind::InsufficientAllowance,
            SwapError::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            SwapError::TransactionReverted(_) => ErrorKind::TransactionReverted,
        }
    }

    pub fn price_unavailable<E>(token_id: impl Into<TokenId>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        SwapError::PriceUnavailable { token_id: token_id.into(), cause: Arc::new(cause) }
    }

    /// Underlying message used as the `details` field of swap error responses.
    pub fn details(&self) -> String {
        match self {
            SwapError::PriceUnavailable { token_id, cause } => format!("{token_id}: {cause}"),
            SwapError::Validation(msg)
            | SwapError::InvalidAmount(msg)
            | SwapError::InvalidPrice(msg)
            | SwapError::ChainUnavailable(msg)
            | SwapError::InsufficientAllowance(msg)
            | SwapError::InsufficientBalance(msg)
            | SwapError::TransactionReverted(msg) => msg.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwapError>;

/// USD spot price of one token at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    token_id: TokenId,
    price_usd: Decimal,
    fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Rejects zero and negative prices.
    pub fn new(token_id: impl Into<TokenId>, price_usd: Decimal, fetched_at: DateTime<Utc>) -> Result<Self> {
        let token_id = token_id.into();
        if price_usd <= Decimal::ZERO {
            return Err(SwapError::InvalidPrice(format!("price for {token_id} must be positive, got {price_usd}")));
        }
        Ok(Self { token_id, price_usd, fetched_at })
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    pub fn price_usd(&self) -> Decimal {
        self.price_usd
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Result of pricing `input_amount` of one token in another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub input_amount: Decimal,
    pub input_price: Decimal,
    pub output_price: Decimal,
    pub output_amount: Decimal,
    pub fee: Decimal,
    pub exchange_rate: Decimal,
}

/// A validated request to swap on-chain. Consumed by the executor.
#[derive(Debug, Clone)]
pub struct SwapIntent {
    pub input_token: Address,
    pub output_token: Address,
    /// In the input token's smallest unit.
    pub amount: U256,
    pub wallet: Address,
    /// Reference into the key store; never the key itself.
    pub key_id: String,
    pub slippage_bps: u32,
}

/// Hashes of both mined legs of a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub approval_tx_hash: B256,
    pub swap_tx_hash: B256,
    /// Gas used by the swap transaction.
    pub gas_used: u64,
}
