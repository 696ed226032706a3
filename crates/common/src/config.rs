//! Simple config loader using TOML and serde.
//! The config struct is intentionally small and typed; every field is
//! optional in the file and can be overridden from the environment.

use crate::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the chain node (e.g., "http://127.0.0.1:8545").
    pub rpc_url: Option<String>,

    /// Governance contract address (0x-prefixed, 40 hex chars).
    pub contract_address: Option<String>,

    /// Content-addressed gateway base URL for off-chain proposal text.
    pub gateway_url: Option<String>,

    /// REST cache endpoint base URL. Absent means no cache backend.
    pub cache_url: Option<String>,

    /// Bearer token for the cache endpoint.
    pub cache_token: Option<String>,

    /// Request timeout for ledger calls in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc_url: Some("http://127.0.0.1:8545".to_string()),
            contract_address: None,
            gateway_url: Some("https://ipfs.io/ipfs".to_string()),
            cache_url: None,
            cache_token: None,
            timeout_ms: Some(30000),
        }
    }
}

/// Load config from a TOML file path.
/// If the file is missing or fails to parse, an error is returned.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let p = path.as_ref();
    let s = fs::read_to_string(p)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

impl Config {
    /// Apply environment overrides on top of this config.
    ///
    /// Variables read:
    /// - `GOVSYNC_RPC_URL`
    /// - `GOVSYNC_CONTRACT_ADDRESS`
    /// - `GOVSYNC_GATEWAY_URL`
    /// - `GOVSYNC_CACHE_URL`
    /// - `GOVSYNC_CACHE_TOKEN`
    /// - `GOVSYNC_TIMEOUT_MS` (must parse as u64)
    pub fn with_env_overrides(mut self) -> Result<Config> {
        if let Ok(v) = std::env::var("GOVSYNC_RPC_URL") {
            self.rpc_url = Some(v);
        }
        if let Ok(v) = std::env::var("GOVSYNC_CONTRACT_ADDRESS") {
            self.contract_address = Some(v);
        }
        if let Ok(v) = std::env::var("GOVSYNC_GATEWAY_URL") {
            self.gateway_url = Some(v);
        }
        if let Ok(v) = std::env::var("GOVSYNC_CACHE_URL") {
            self.cache_url = Some(v);
        }
        if let Ok(v) = std::env::var("GOVSYNC_CACHE_TOKEN") {
            self.cache_token = Some(v);
        }
        if let Ok(v) = std::env::var("GOVSYNC_TIMEOUT_MS") {
            let parsed = v
                .parse::<u64>()
                .map_err(|_| format!("GOVSYNC_TIMEOUT_MS invalid: '{}'", v))?;
            self.timeout_ms = Some(parsed);
        }
        Ok(self)
    }
}
