//! HTTP surface over [`SwapEngine`].

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::SwapEngine;
use crate::types::{ErrorKind, SwapError, SwapIntent, DEFAULT_SLIPPAGE_BPS};

const MISSING_PARAMS: &str = "Missing required parameters";

#[derive(Serialize)]
struct HealthResp {
    status: &'static str,
}

#[derive(Serialize)]
struct PriceResp {
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteReq {
    input_token: Option<String>,
    output_token: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    input_amount: Option<Decimal>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResp {
    input_token: String,
    output_token: String,
    #[serde(with = "rust_decimal::serde::float")]
    input_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    input_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    output_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    output_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    exchange_rate: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImpactResp {
    #[serde(with = "rust_decimal::serde::float")]
    price_impact: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapReq {
    input_token_address: Option<String>,
    output_token_address: Option<String>,
    amount: Option<String>,
    wallet_address: Option<String>,
    key_id: Option<String>,
    /// Percent, e.g. `0.5` for 50 bps.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    slippage_tolerance: Option<Decimal>,
    private_key: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapResp {
    success: bool,
    approval_tx_hash: B256,
    swap_tx_hash: B256,
    gas_used: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllowanceResp {
    token_address: Address,
    wallet_address: Address,
    allowance: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Error response: `{error}` or, for swap execution, `{error, kind, details}`.
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, body: ErrorBody { error: msg.into(), kind: None, details: None } }
    }

    fn from_swap_failure(err: SwapError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorBody {
                error: "Swap failed".to_string(),
                kind: Some(err.kind().to_string()),
                details: Some(err.details()),
            },
        }
    }
}

impl From<SwapError> for ApiError {
    fn from(err: SwapError) -> Self {
        Self { status: status_for(&err), body: ErrorBody { error: err.to_string(), kind: None, details: None } }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, "request failed: {}", self.body.error);
        }
        (self.status, Json(self.body)).into_response()
    }
}

fn status_for(err: &SwapError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

pub struct ApiServer {
    engine: Arc<SwapEngine>,
}

impl ApiServer {
    pub fn new(engine: Arc<SwapEngine>) -> Self {
        Self { engine }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(|| async { Json(HealthResp { status: "ok" }) }))
            .route("/api/prices/:token_id", get(get_price))
            .route("/api/calculate-swap", post(calculate_swap))
            .route("/api/price-impact", post(price_impact))
            .route("/api/swap", post(execute_swap))
            .route("/api/allowance/:token_address/:wallet_address", get(get_allowance))
            .with_state(Arc::clone(&self.engine))
    }

    pub async fn start(self, addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = addr.parse().with_context(|| format!("invalid listen address {addr}"))?;
        let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("bind {addr}"))?;
        info!(%addr, "swap-quoter API listening");
        axum::serve(listener, self.router()).await.context("server failed")
    }
}

async fn get_price(State(engine): State<Arc<SwapEngine>>, Path(token_id): Path<String>) -> ApiResult<PriceResp> {
    let quote = engine.price(&token_id).await?;
    Ok(Json(PriceResp { price: quote.price_usd() }))
}

fn quote_params(req: QuoteReq) -> std::result::Result<(String, String, Decimal), ApiError> {
    match (req.input_token, req.output_token, req.input_amount) {
        (Some(input), Some(output), Some(amount)) if !input.is_empty() && !output.is_empty() => {
            Ok((input, output, amount))
        }
        _ => Err(ApiError::bad_request(MISSING_PARAMS)),
    }
}

async fn calculate_swap(
    State(engine): State<Arc<SwapEngine>>,
    body: std::result::Result<Json<QuoteReq>, JsonRejection>,
) -> ApiResult<QuoteResp> {
    let Json(req) = body?;
    let (input, output, amount) = quote_params(req)?;
    let priced = engine.calculate_swap(&input, &output, amount).await?;
    let q = priced.quote;
    Ok(Json(QuoteResp {
        input_token: priced.input_token,
        output_token: priced.output_token,
        input_amount: q.input_amount,
        input_price: q.input_price,
        output_price: q.output_price,
        output_amount: q.output_amount,
        fee: q.fee,
        exchange_rate: q.exchange_rate,
    }))
}

async fn price_impact(
    State(engine): State<Arc<SwapEngine>>,
    body: std::result::Result<Json<QuoteReq>, JsonRejection>,
) -> ApiResult<ImpactResp> {
    let Json(req) = body?;
    let (input, output, amount) = quote_params(req)?;
    let price_impact = engine.price_impact(&input, &output, amount).await?;
    Ok(Json(ImpactResp { price_impact }))
}

async fn execute_swap(
    State(engine): State<Arc<SwapEngine>>,
    body: std::result::Result<Json<SwapReq>, JsonRejection>,
) -> ApiResult<SwapResp> {
    let Json(req) = body?;
    let intent = swap_intent(req)?;
    let result = engine.execute_swap(intent).await.map_err(ApiError::from_swap_failure)?;
    Ok(Json(SwapResp {
        success: true,
        approval_tx_hash: result.approval_tx_hash,
        swap_tx_hash: result.swap_tx_hash,
        gas_used: result.gas_used,
    }))
}

async fn get_allowance(
    State(engine): State<Arc<SwapEngine>>,
    Path((token, wallet)): Path<(String, String)>,
) -> ApiResult<AllowanceResp> {
    let token_address = parse_address(&token, "tokenAddress")?;
    let wallet_address = parse_address(&wallet, "walletAddress")?;
    let allowance = engine.allowance(token_address, wallet_address).await?;
    Ok(Json(AllowanceResp { token_address, wallet_address, allowance: allowance.to_string() }))
}

fn swap_intent(req: SwapReq) -> std::result::Result<SwapIntent, ApiError> {
    if req.private_key.is_some() {
        return Err(ApiError::bad_request("privateKey is not accepted, reference a configured keyId instead"));
    }
    let (Some(input), Some(output), Some(amount), Some(wallet), Some(key_id)) = (
        req.input_token_address,
        req.output_token_address,
        req.amount,
        req.wallet_address,
        req.key_id,
    ) else {
        return Err(ApiError::bad_request(MISSING_PARAMS));
    };

    Ok(SwapIntent {
        input_token: parse_address(&input, "inputTokenAddress")?,
        output_token: parse_address(&output, "outputTokenAddress")?,
        amount: parse_amount(&amount)?,
        wallet: parse_address(&wallet, "walletAddress")?,
        key_id,
        slippage_bps: match req.slippage_tolerance {
            Some(percent) => slippage_bps(percent)?,
            None => DEFAULT_SLIPPAGE_BPS,
        },
    })
}

fn parse_address(raw: &str, field: &str) -> std::result::Result<Address, ApiError> {
    Address::from_str(raw.trim()).map_err(|e| ApiError::bad_request(format!("invalid {field} '{raw}': {e}")))
}

/// Smallest-unit amount as a base-10 integer string.
fn parse_amount(raw: &str) -> std::result::Result<U256, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request(format!("amount must be a base-10 integer, got '{raw}'")));
    }
    U256::from_str_radix(raw, 10).map_err(|e| ApiError::bad_request(format!("amount '{raw}' out of range: {e}")))
}

fn slippage_bps(percent: Decimal) -> std::result::Result<u32, ApiError> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ApiError::bad_request(format!("slippageTolerance must be between 0 and 100, got {percent}")));
    }
    (percent * Decimal::ONE_HUNDRED)
        .round()
        .to_u32()
        .ok_or_else(|| ApiError::bad_request(format!("slippageTolerance {percent} is not representable")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn slippage_percent_becomes_bps() {
        assert_eq!(slippage_bps(dec!(0.5)).ok(), Some(50));
        assert_eq!(slippage_bps(dec!(100)).ok(), Some(10_000));
        assert!(slippage_bps(dec!(100.01)).is_err());
        assert!(slippage_bps(dec!(-1)).is_err());
    }

    #[test]
    fn amount_must_be_decimal_digits() {
        assert_eq!(parse_amount("1000").ok(), Some(U256::from(1000u64)));
        assert!(parse_amount("0x10").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1.5").is_err());
    }
}
