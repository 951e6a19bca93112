//! Two-leg on-chain swap: approve the router, then swap with slippage and
//! deadline guards.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use tracing::{error, info, instrument};

use super::quoting::min_amount_out;
use crate::chain::{ChainClient, SwapCall};
use crate::signer::{SignerRef, SigningKeys};
use crate::types::{ExecutionResult, Result, SwapError, SwapIntent};

/// Seconds after submission before the router refuses the swap.
pub const SWAP_DEADLINE_SECS: i64 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    Pending,
    Approving,
    Approved,
    Quoting,
    Submitting,
    Confirmed,
    Failed,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `[input, intermediate, output]`, or the direct pair when one side already
/// is the intermediate token.
pub fn swap_path(input: Address, intermediate: Address, output: Address) -> Vec<Address> {
    if input == intermediate || output == intermediate {
        vec![input, output]
    } else {
        vec![input, intermediate, output]
    }
}

pub struct SwapExecutor {
    chain: Arc<dyn ChainClient>,
    keys: Arc<dyn SigningKeys>,
    intermediate_token: Address,
}

impl SwapExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, keys: Arc<dyn SigningKeys>, intermediate_token: Address) -> Self {
        Self { chain, keys, intermediate_token }
    }

    /// Run the whole pipeline. Whatever fails ends the execution with that
    /// error; a mined approval is left in place.
    #[instrument(skip(self, intent), fields(wallet = %intent.wallet, input = %intent.input_token, output = %intent.output_token))]
    pub async fn execute(&self, intent: SwapIntent) -> Result<ExecutionResult> {
        let mut stage = SwapStage::Pending;
        match self.run(&intent, &mut stage).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(failed_at = %stage, kind = %e.kind(), "swap failed: {}", e);
                advance(&mut stage, SwapStage::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, intent: &SwapIntent, stage: &mut SwapStage) -> Result<ExecutionResult> {
        validate_intent(intent)?;
        let signer = self.resolve_signer(intent).await?;
        let router = self.chain.router();

        let balance = self.chain.balance_of(intent.input_token, intent.wallet).await?;
        if balance < intent.amount {
            return Err(SwapError::InsufficientBalance(format!(
                "wallet holds {balance}, swap needs {}",
                intent.amount
            )));
        }

        advance(stage, SwapStage::Approving);
        let approval = self.chain.approve(signer, intent.input_token, router, intent.amount).await?;
        advance(stage, SwapStage::Approved);

        advance(stage, SwapStage::Quoting);
        let path = swap_path(intent.input_token, self.intermediate_token, intent.output_token);
        let amounts = self.chain.get_amounts_out(intent.amount, &path).await?;
        let expected_out = *amounts
            .last()
            .ok_or_else(|| SwapError::TransactionReverted("router returned no amounts".to_string()))?;
        let min_out = min_amount_out(expected_out, intent.slippage_bps)?;
        info!(%expected_out, %min_out, slippage_bps = intent.slippage_bps, "quoted swap");

        advance(stage, SwapStage::Submitting);
        let deadline = u64::try_from(Utc::now().timestamp() + SWAP_DEADLINE_SECS).unwrap_or(u64::MAX);
        let call = SwapCall {
            amount_in: intent.amount,
            min_amount_out: min_out,
            path,
            recipient: intent.wallet,
            deadline,
        };
        let swap = self.chain.swap_exact_tokens_for_tokens(signer, call).await?;
        advance(stage, SwapStage::Confirmed);

        Ok(ExecutionResult {
            approval_tx_hash: approval.tx_hash,
            swap_tx_hash: swap.tx_hash,
            gas_used: swap.gas_used,
        })
    }

    async fn resolve_signer<'a>(&'a self, intent: &'a SwapIntent) -> Result<SignerRef<'a>> {
        let address = self.keys.address(&intent.key_id).await?;
        if address != intent.wallet {
            return Err(SwapError::Validation(format!(
                "key '{}' does not control wallet {}",
                intent.key_id, intent.wallet
            )));
        }
        Ok(SignerRef { keys: self.keys.as_ref(), key_id: &intent.key_id, address })
    }
}

fn advance(stage: &mut SwapStage, next: SwapStage) {
    info!(from = %stage, to = %next, "swap stage");
    *stage = next;
}

fn validate_intent(intent: &SwapIntent) -> Result<()> {
    if intent.amount.is_zero() {
        return Err(SwapError::InvalidAmount("swap amount must be positive".to_string()));
    }
    if intent.input_token == intent.output_token {
        return Err(SwapError::Validation("input and output token are the same".to_string()));
    }
    if intent.input_token == Address::ZERO || intent.output_token == Address::ZERO {
        return Err(SwapError::Validation("token address must not be zero".to_string()));
    }
    // Tolerances above 100 % fail here, before anything is sent.
    min_amount_out(U256::ZERO, intent.slippage_bps)?;
    Ok(())
}
