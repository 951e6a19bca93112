//! Swap execution tests for swap-quoter against a recording chain.

mod common;

use std::sync::Arc;

use alloy::primitives::{address, U256};
use chrono::Utc;
use swap_quoter::engine::execution::{SwapExecutor, SWAP_DEADLINE_SECS};
use swap_quoter::types::{ErrorKind, SwapError, SwapIntent, DEFAULT_SLIPPAGE_BPS};

use common::{dev_keys, ChainCall, MockChain, APPROVAL_HASH, DEV_WALLET, ROUTER, SWAP_GAS, SWAP_HASH, TKA, TKB, WETH};

fn intent() -> SwapIntent {
    SwapIntent {
        input_token: TKA,
        output_token: TKB,
        amount: U256::from(1000u64),
        wallet: DEV_WALLET,
        key_id: "dev".to_string(),
        slippage_bps: DEFAULT_SLIPPAGE_BPS,
    }
}

fn executor(chain: &Arc<MockChain>) -> SwapExecutor {
    SwapExecutor::new(chain.clone(), Arc::new(dev_keys()), WETH)
}

#[tokio::test]
async fn test_approve_then_swap_through_intermediate() {
    let chain = Arc::new(MockChain::new());
    let result = executor(&chain).execute(intent()).await.unwrap();

    assert_eq!(result.approval_tx_hash, APPROVAL_HASH);
    assert_eq!(result.swap_tx_hash, SWAP_HASH);
    assert_eq!(result.gas_used, SWAP_GAS);

    let calls = chain.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[0],
        ChainCall::Approve { token: TKA, spender: ROUTER, amount: U256::from(1000u64), from: DEV_WALLET }
    );
    assert_eq!(calls[1], ChainCall::Quote { amount_in: U256::from(1000u64), path: vec![TKA, WETH, TKB] });
    let ChainCall::Swap(swap) = &calls[2] else {
        panic!("expected swap call, got {:?}", calls[2]);
    };
    assert_eq!(swap.amount_in, U256::from(1000u64));
    assert_eq!(swap.min_amount_out, U256::from(995u64));
    assert_eq!(swap.path, vec![TKA, WETH, TKB]);
    assert_eq!(swap.recipient, DEV_WALLET);

    let expected_deadline = (Utc::now().timestamp() + SWAP_DEADLINE_SECS) as u64;
    assert!(swap.deadline <= expected_deadline && swap.deadline + 5 >= expected_deadline);
}

#[tokio::test]
async fn test_direct_path_when_output_is_intermediate() {
    let chain = Arc::new(MockChain {
        amounts_out: Ok(vec![U256::from(1000u64), U256::from(2000u64)]),
        ..MockChain::new()
    });
    let mut to_weth = intent();
    to_weth.output_token = WETH;
    to_weth.slippage_bps = 100;
    executor(&chain).execute(to_weth).await.unwrap();

    let calls = chain.calls();
    let ChainCall::Swap(swap) = &calls[2] else {
        panic!("expected swap call, got {:?}", calls[2]);
    };
    assert_eq!(swap.path, vec![TKA, WETH]);
    assert_eq!(swap.min_amount_out, U256::from(1980u64));
}

#[tokio::test]
async fn test_quote_failure_after_approval_stops_before_swap() {
    let chain = Arc::new(MockChain {
        amounts_out: Err(SwapError::TransactionReverted("UniswapV2Library: INSUFFICIENT_LIQUIDITY".into())),
        ..MockChain::new()
    });
    let err = executor(&chain).execute(intent()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransactionReverted);
    let calls = chain.calls();
    assert!(matches!(calls[0], ChainCall::Approve { .. }));
    assert!(!calls.iter().any(|c| matches!(c, ChainCall::Swap(_))));
}

#[tokio::test]
async fn test_empty_amounts_is_reverted() {
    let chain = Arc::new(MockChain { amounts_out: Ok(vec![]), ..MockChain::new() });
    let err = executor(&chain).execute(intent()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionReverted);
    assert_eq!(chain.calls().len(), 2);
}

#[tokio::test]
async fn test_failed_approval_is_propagated() {
    let chain = Arc::new(MockChain {
        approve_error: Some(SwapError::ChainUnavailable("no receipt".into())),
        ..MockChain::new()
    });
    let err = executor(&chain).execute(intent()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainUnavailable);
    assert_eq!(chain.calls().len(), 1);
}

#[tokio::test]
async fn test_wallet_must_match_key() {
    let chain = Arc::new(MockChain::new());
    let mut other = intent();
    other.wallet = address!("1111111111111111111111111111111111111111");

    let err = executor(&chain).execute(other).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(chain.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_key_id_is_rejected() {
    let chain = Arc::new(MockChain::new());
    let mut unknown = intent();
    unknown.key_id = "treasury".to_string();

    let err = executor(&chain).execute(unknown).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.details().contains("treasury"));
}

#[tokio::test]
async fn test_insufficient_balance_sends_nothing() {
    let chain = Arc::new(MockChain { balance: U256::from(999u64), ..MockChain::new() });
    let err = executor(&chain).execute(intent()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    assert!(chain.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_intents_fail_before_chain_access() {
    let chain = Arc::new(MockChain::new());
    let exec = executor(&chain);

    let mut zero = intent();
    zero.amount = U256::ZERO;
    assert_eq!(exec.execute(zero).await.unwrap_err().kind(), ErrorKind::InvalidAmount);

    let mut same = intent();
    same.output_token = TKA;
    assert_eq!(exec.execute(same).await.unwrap_err().kind(), ErrorKind::Validation);

    let mut loose = intent();
    loose.slippage_bps = 10_001;
    assert_eq!(exec.execute(loose).await.unwrap_err().kind(), ErrorKind::Validation);

    assert!(chain.calls().is_empty());
}
