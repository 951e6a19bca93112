//! Key store abstraction for transaction signing.
//!
//! Requests reference keys by id. Secret material stays inside the store and
//! only signed envelopes come out.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;

use crate::types::{Result, SwapError};

#[async_trait]
pub trait SigningKeys: Send + Sync {
    /// Address controlled by `key_id`.
    async fn address(&self, key_id: &str) -> Result<Address>;

    /// Sign `tx` with `key_id`.
    async fn sign(&self, key_id: &str, tx: TxLegacy) -> Result<TxEnvelope>;
}

/// A resolved signing identity handed to the chain adapter.
#[derive(Clone, Copy)]
pub struct SignerRef<'a> {
    pub keys: &'a dyn SigningKeys,
    pub key_id: &'a str,
    pub address: Address,
}

/// In-process key store loaded from a TOML file:
///
/// ```toml
/// [keys]
/// treasury = "0x..."
/// ```
#[derive(Default)]
pub struct LocalKeyStore {
    keys: HashMap<String, PrivateKeySigner>,
}

#[derive(Deserialize)]
struct KeyFile {
    #[serde(default)]
    keys: HashMap<String, String>,
}

impl LocalKeyStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("unable to read key file {}", path.as_ref().display()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let file: KeyFile = toml::from_str(text).context("key file is not valid TOML")?;
        let mut keys = HashMap::with_capacity(file.keys.len());
        for (id, secret) in file.keys {
            let signer = PrivateKeySigner::from_str(secret.trim())
                .map_err(|e| anyhow!("invalid secret for key {id}: {e}"))?;
            keys.insert(id, signer);
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn signer(&self, key_id: &str) -> Result<&PrivateKeySigner> {
        self.keys
            .get(key_id)
            .ok_or_else(|| SwapError::Validation(format!("unknown signing key '{key_id}'")))
    }
}

#[async_trait]
impl SigningKeys for LocalKeyStore {
    async fn address(&self, key_id: &str) -> Result<Address> {
        Ok(self.signer(key_id)?.address())
    }

    async fn sign(&self, key_id: &str, tx: TxLegacy) -> Result<TxEnvelope> {
        let signer = self.signer(key_id)?;
        let hash = tx.signature_hash();
        let sig = signer
            .sign_hash_sync(&hash)
            .map_err(|e| SwapError::TransactionReverted(format!("signing failed: {e}")))?;
        Ok(TxEnvelope::Legacy(tx.into_signed(sig)))
    }
}
