//! Spot price lookups against an HTTP quote provider.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Result, SwapError};
use crate::utils::retry::{with_backoff, BackoffConfig};

pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Source of USD spot prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price of one unit of `token_id`. Errors are always
    /// [`SwapError::PriceUnavailable`].
    async fn fetch(&self, token_id: &str) -> Result<Decimal>;
}

/// Why a single price request failed. Carried as the source of
/// [`SwapError::PriceUnavailable`].
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("provider has no usd price for {0}")]
    MissingPrice(String),
    #[error("provider returned unusable price {0}")]
    BadPrice(f64),
}

impl FetchFailure {
    fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchFailure::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchFailure::MissingPrice(_) | FetchFailure::BadPrice(_) => false,
        }
    }
}

/// `/simple/price` client for CoinGecko-compatible providers.
#[derive(Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    backoff: BackoffConfig,
}

impl CoinGeckoSource {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration, backoff: BackoffConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SwapError::Validation(format!("cannot build price client: {e}")))?;
        Ok(Self::with_client(client, base_url, api_key, backoff))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>, backoff: BackoffConfig) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, api_key, backoff }
    }

    async fn fetch_once(&self, token_id: &str) -> std::result::Result<Decimal, FetchFailure> {
        let url = format!("{}/simple/price", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("ids", token_id), ("vs_currencies", "usd")]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchFailure::Status { status, body });
        }

        let prices: HashMap<String, HashMap<String, f64>> = response.json().await?;
        let usd = prices
            .get(token_id)
            .and_then(|p| p.get("usd"))
            .copied()
            .ok_or_else(|| FetchFailure::MissingPrice(token_id.to_string()))?;
        parse_usd(usd)
    }
}

fn parse_usd(usd: f64) -> std::result::Result<Decimal, FetchFailure> {
    match Decimal::from_f64(usd) {
        Some(price) if price > Decimal::ZERO => Ok(price),
        _ => Err(FetchFailure::BadPrice(usd)),
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch(&self, token_id: &str) -> Result<Decimal> {
        debug!(token_id, "fetching spot price");
        with_backoff(&self.backoff, "price fetch", FetchFailure::is_transient, || self.fetch_once(token_id))
            .await
            .map_err(|e| {
                warn!(token_id, "Error fetching price: {}", e);
                SwapError::price_unavailable(token_id, e)
            })
    }
}
