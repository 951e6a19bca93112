//! Router and ERC-20 access on an EVM network.

pub mod contracts;
pub mod evm;

use alloy::primitives::{Address, B256, U256};
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;

use crate::signer::SignerRef;
use crate::types::{Result, SwapError};

pub use evm::EvmChain;

/// A mined transaction with a successful receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub gas_used: u64,
}

/// Arguments of `swapExactTokensForTokens`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Unix timestamp, seconds.
    pub deadline: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Router contract used for quotes, swaps and as approval spender.
    fn router(&self) -> Address;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    /// Router `getAmountsOut`; one amount per path element.
    async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>>;

    /// Submit `approve(spender, amount)` on `token` and wait until it is mined.
    async fn approve(&self, signer: SignerRef<'_>, token: Address, spender: Address, amount: U256) -> Result<TxOutcome>;

    /// Submit a router swap and wait until it is mined.
    async fn swap_exact_tokens_for_tokens(&self, signer: SignerRef<'_>, call: SwapCall) -> Result<TxOutcome>;
}

/// Map a node-reported failure message to an error kind.
pub fn classify_revert(message: &str) -> SwapError {
    let lower = message.to_lowercase();
    let allowance = ["insufficient allowance", "exceeds allowance", "transfer_from_failed"];
    let balance = ["insufficient balance", "exceeds balance", "insufficient funds"];

    if allowance.iter().any(|needle| lower.contains(needle)) {
        SwapError::InsufficientAllowance(message.to_string())
    } else if balance.iter().any(|needle| lower.contains(needle)) {
        SwapError::InsufficientBalance(message.to_string())
    } else {
        SwapError::TransactionReverted(message.to_string())
    }
}

/// JSON-RPC error responses come from the node and are classified by
/// message; anything else means the node could not be reached or understood.
pub fn classify_rpc_error(err: &RpcError<TransportErrorKind>) -> SwapError {
    match err {
        RpcError::ErrorResp(payload) => classify_revert(&payload.message),
        other => SwapError::ChainUnavailable(other.to_string()),
    }
}

pub fn classify_contract_error(err: &alloy::contract::Error) -> SwapError {
    match err {
        alloy::contract::Error::TransportError(e) => classify_rpc_error(e),
        other => SwapError::ChainUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn allowance_reasons() {
        for msg in [
            "execution reverted: ERC20: insufficient allowance",
            "execution reverted: ERC20: transfer amount exceeds allowance",
            "execution reverted: TransferHelper: TRANSFER_FROM_FAILED",
        ] {
            assert_eq!(classify_revert(msg).kind(), ErrorKind::InsufficientAllowance, "{msg}");
        }
    }

    #[test]
    fn balance_reasons() {
        for msg in [
            "execution reverted: ERC20: transfer amount exceeds balance",
            "insufficient funds for gas * price + value",
        ] {
            assert_eq!(classify_revert(msg).kind(), ErrorKind::InsufficientBalance, "{msg}");
        }
    }

    #[test]
    fn other_reasons_are_reverts() {
        let err = classify_revert("execution reverted: UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT");
        assert_eq!(err.kind(), ErrorKind::TransactionReverted);
        assert_eq!(classify_revert("nonce too low").kind(), ErrorKind::TransactionReverted);
    }

    #[test]
    fn transport_failures_are_unavailable() {
        let err: RpcError<TransportErrorKind> = TransportErrorKind::custom_str("connection refused");
        assert_eq!(classify_rpc_error(&err).kind(), ErrorKind::ChainUnavailable);
    }
}
