//! Configuration loading, env vars, CLI flags.
//!
//! Precedence for every setting: CLI flag, then config file, then
//! environment variable, then the built-in default.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{address, Address};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::info;

#[cfg(feature = "cli")]
use clap::Args;

use crate::data_management::cache::{DEFAULT_PRICE_CAPACITY, DEFAULT_PRICE_TTL_SECS};
use crate::data_management::price_source::DEFAULT_PRICE_API_URL;

pub const CONFIG_PATH_ENV: &str = "SWAP_QUOTER_CONFIG";

const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
const DEFAULT_CHAIN_ID: u64 = 11_155_111;
// Uniswap V2 Router02 and WETH on Sepolia.
const DEFAULT_ROUTER: Address = address!("eE567Fe1712Faf6149d80dA1E6934E354124CfE3");
const DEFAULT_INTERMEDIATE: Address = address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14");

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rpc_url: String,
    pub chain_id: u64,
    pub router_address: Address,
    pub intermediate_token: Address,
    pub price_api_url: String,
    pub price_api_key: Option<String>,
    pub price_cache_ttl: Duration,
    pub price_cache_capacity: usize,
    pub price_fetch_retries: u32,
    pub price_timeout: Duration,
    pub rpc_timeout: Duration,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub keystore_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub router_address: Option<String>,
    pub intermediate_token: Option<String>,
    pub price_api_url: Option<String>,
    pub price_api_key: Option<String>,
    pub price_cache_ttl_secs: Option<u64>,
    pub price_cache_capacity: Option<usize>,
    pub price_fetch_retries: Option<u32>,
    pub price_timeout_secs: Option<u64>,
    pub rpc_timeout_secs: Option<u64>,
    pub receipt_timeout_secs: Option<u64>,
    pub receipt_poll_ms: Option<u64>,
    pub keystore_file: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Args, Debug, Clone, Default)]
pub struct CliConfig {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,
    #[arg(long, global = true)]
    pub chain_id: Option<u64>,
    #[arg(long, global = true)]
    pub router_address: Option<String>,
    #[arg(long, global = true)]
    pub intermediate_token: Option<String>,
    #[arg(long, global = true)]
    pub price_api_url: Option<String>,
    #[arg(long, global = true)]
    pub price_api_key: Option<String>,
    #[arg(long, global = true)]
    pub keystore_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }
}

/// Lookup of a single setting across one layer plus the environment.
struct Layers<'a, E: Fn(&str) -> Option<String>> {
    env: &'a E,
}

impl<E: Fn(&str) -> Option<String>> Layers<'_, E> {
    fn pick<T>(&self, explicit: Option<T>, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        if explicit.is_some() {
            return Ok(explicit);
        }
        match (self.env)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| anyhow!("invalid value for {key}: {e}")),
            None => Ok(None),
        }
    }
}

fn parse_address(raw: &str, what: &str) -> anyhow::Result<Address> {
    Address::from_str(raw.trim()).map_err(|e| anyhow!("invalid {what} address '{raw}': {e}"))
}

impl AppConfig {
    /// Environment plus the optional file named by `SWAP_QUOTER_CONFIG`.
    pub fn load() -> anyhow::Result<Self> {
        let file = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => FileConfig::from_path(path.as_ref())?,
            Err(_) => FileConfig::default(),
        };
        Self::from_layers(file, &|key: &str| env::var(key).ok())
    }

    #[cfg(feature = "cli")]
    pub fn load_with_cli(cli: &CliConfig) -> anyhow::Result<Self> {
        let path = cli.config.clone().or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));
        let mut file = match path {
            Some(path) => FileConfig::from_path(&path)?,
            None => FileConfig::default(),
        };
        let cli = cli.clone();
        file.rpc_url = cli.rpc_url.or(file.rpc_url);
        file.chain_id = cli.chain_id.or(file.chain_id);
        file.router_address = cli.router_address.or(file.router_address);
        file.intermediate_token = cli.intermediate_token.or(file.intermediate_token);
        file.price_api_url = cli.price_api_url.or(file.price_api_url);
        file.price_api_key = cli.price_api_key.or(file.price_api_key);
        file.keystore_file = cli.keystore_file.or(file.keystore_file);
        Self::from_layers(file, &|key: &str| env::var(key).ok())
    }

    /// Resolve a config from an already-merged file layer and an env lookup.
    pub fn from_layers<E>(file: FileConfig, env: &E) -> anyhow::Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let layers = Layers { env };
        let secs = |v: Option<u64>, default: u64| Duration::from_secs(v.unwrap_or(default));

        let rpc_url = layers.pick(file.rpc_url, "WEB3_PROVIDER_URL")?;
        if rpc_url.is_none() {
            info!("WEB3_PROVIDER_URL not set, using {}", DEFAULT_RPC_URL);
        }
        let router_address = match layers.pick::<String>(file.router_address, "ROUTER_ADDRESS")? {
            Some(raw) => parse_address(&raw, "router")?,
            None => DEFAULT_ROUTER,
        };
        let intermediate_token = match layers.pick::<String>(file.intermediate_token, "INTERMEDIATE_TOKEN")? {
            Some(raw) => parse_address(&raw, "intermediate token")?,
            None => DEFAULT_INTERMEDIATE,
        };

        Ok(Self {
            host: layers.pick(file.host, "HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: layers.pick(file.port, "PORT")?.unwrap_or(3000),
            rpc_url: rpc_url.unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            chain_id: layers.pick(file.chain_id, "CHAIN_ID")?.unwrap_or(DEFAULT_CHAIN_ID),
            router_address,
            intermediate_token,
            price_api_url: layers
                .pick(file.price_api_url, "PRICE_API_URL")?
                .unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string()),
            price_api_key: layers.pick(file.price_api_key, "PRICE_API_KEY")?,
            price_cache_ttl: secs(layers.pick(file.price_cache_ttl_secs, "PRICE_CACHE_TTL_SECS")?, DEFAULT_PRICE_TTL_SECS),
            price_cache_capacity: layers
                .pick(file.price_cache_capacity, "PRICE_CACHE_CAPACITY")?
                .unwrap_or(DEFAULT_PRICE_CAPACITY),
            price_fetch_retries: layers.pick(file.price_fetch_retries, "PRICE_FETCH_RETRIES")?.unwrap_or(2),
            price_timeout: secs(layers.pick(file.price_timeout_secs, "PRICE_TIMEOUT_SECS")?, 10),
            rpc_timeout: secs(layers.pick(file.rpc_timeout_secs, "RPC_TIMEOUT_SECS")?, 20),
            receipt_timeout: secs(layers.pick(file.receipt_timeout_secs, "RECEIPT_TIMEOUT_SECS")?, 300),
            receipt_poll_interval: Duration::from_millis(
                layers.pick(file.receipt_poll_ms, "RECEIPT_POLL_MS")?.unwrap_or(1000),
            ),
            keystore_file: layers.pick(file.keystore_file, "KEYSTORE_FILE")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
