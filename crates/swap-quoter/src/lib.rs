// Library entry point for swap-quoter

pub mod chain;
pub mod config;
pub mod data_management;
pub mod engine;
pub mod signer;
pub mod types;
pub mod utils;

#[cfg(feature = "api")]
pub mod api;

pub use alloy::primitives::{Address, B256, U256};
pub use engine::SwapEngine;
