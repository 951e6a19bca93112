//! Swap amount, fee, exchange rate and price impact computations.
//!
//! Everything here is pure: prices come in as arguments, nothing is fetched.

use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::types::{Result, SwapError, SwapQuote};

/// Flat pool fee taken from the gross output (0.3 %, same as Uniswap V2).
pub const FEE_BPS: u32 = 30;
const BPS_DENOMINATOR: u32 = 10_000;

/// Fee as a fraction of the gross output amount.
pub fn fee_rate() -> Decimal {
    Decimal::new(i64::from(FEE_BPS), 4)
}

pub fn validate_amount(input_amount: Decimal) -> Result<()> {
    if input_amount <= Decimal::ZERO {
        return Err(SwapError::InvalidAmount(format!("input amount must be positive, got {input_amount}")));
    }
    Ok(())
}

fn validate_price(label: &str, price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(SwapError::InvalidPrice(format!("{label} price must be positive, got {price}")));
    }
    Ok(())
}

fn overflow(what: &str) -> SwapError {
    SwapError::InvalidAmount(format!("{what} overflows decimal range"))
}

/// Price `input_amount` of the input token in units of the output token.
///
/// `gross = amount * input_price / output_price`, then the fee is
/// `gross * 0.003` and `output_amount = gross - fee`. The exchange rate is the
/// plain price ratio and does not depend on the amount.
pub fn quote(input_amount: Decimal, input_price: Decimal, output_price: Decimal) -> Result<SwapQuote> {
    validate_amount(input_amount)?;
    validate_price("input", input_price)?;
    validate_price("output", output_price)?;

    let input_value_usd = input_amount.checked_mul(input_price).ok_or_else(|| overflow("input value"))?;
    let gross = input_value_usd.checked_div(output_price).ok_or_else(|| overflow("output amount"))?;
    let fee = gross.checked_mul(fee_rate()).ok_or_else(|| overflow("fee"))?;
    let exchange_rate = input_price.checked_div(output_price).ok_or_else(|| overflow("exchange rate"))?;

    Ok(SwapQuote {
        input_amount,
        input_price,
        output_price,
        output_amount: gross - fee,
        fee,
        exchange_rate,
    })
}

/// Deviation, in percent, between the exchange rate at `input_amount` and
/// the rate at one unit.
///
/// Both quotes use the same price pair and the rate is a price ratio, so for
/// this fee model the result is always zero. Callers that want a real impact
/// figure need distinct pre/post-trade price snapshots, which this model does
/// not have.
pub fn price_impact(input_amount: Decimal, input_price: Decimal, output_price: Decimal) -> Result<Decimal> {
    let base = quote(Decimal::ONE, input_price, output_price)?;
    let actual = quote(input_amount, input_price, output_price)?;

    let deviation = (actual.exchange_rate - base.exchange_rate).abs();
    deviation
        .checked_div(base.exchange_rate)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("price impact"))
}

/// Smallest acceptable swap output for a slippage tolerance in basis points.
///
/// Integer math in the token's smallest unit, rounding down.
pub fn min_amount_out(expected_out: U256, slippage_bps: u32) -> Result<U256> {
    if slippage_bps > BPS_DENOMINATOR {
        return Err(SwapError::Validation(format!(
            "slippage tolerance {slippage_bps} bps exceeds {BPS_DENOMINATOR} bps"
        )));
    }
    let keep = U256::from(BPS_DENOMINATOR - slippage_bps);
    expected_out
        .checked_mul(keep)
        .map(|scaled| scaled / U256::from(BPS_DENOMINATOR))
        .ok_or_else(|| SwapError::InvalidAmount(format!("expected output {expected_out} too large")))
}
