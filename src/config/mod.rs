use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::parse_account;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_STATUS_TIMEOUT_MS: u64 = 5000;

pub const ENV_CONFIG: &str = "SUPPLYCHAIN_CONFIG";
pub const ENV_CONTRACT_ADDRESS: &str = "SUPPLYCHAIN_CONTRACT_ADDRESS";
pub const ENV_RPC_URL: &str = "SUPPLYCHAIN_RPC_URL";
pub const ENV_PRIVATE_KEY: &str = "SUPPLYCHAIN_PRIVATE_KEY";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub contract_address: Option<String>,
    pub rpc_url: Option<String>,
    pub status_timeout_ms: Option<u64>,
    pub scan_concurrency: Option<usize>,
    #[serde(default)]
    pub estimate_transfers: bool,
}

/// Effective settings after file, environment and flag overrides
#[derive(Debug, Clone)]
pub struct Settings {
    pub contract_address: Address,
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub status_timeout: Duration,
    pub scan_concurrency: usize,
    pub estimate_transfers: bool,
}

/// Values taken from the environment, split out so resolution stays testable
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub contract_address: Option<String>,
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            contract_address: var(ENV_CONTRACT_ADDRESS),
            rpc_url: var(ENV_RPC_URL),
            private_key: var(ENV_PRIVATE_KEY),
        }
    }
}

impl Config {
    /// Resolve precedence: flag > environment > file > default
    pub fn resolve(
        &self,
        env: &EnvOverrides,
        rpc_flag: Option<&str>,
        contract_flag: Option<&str>,
    ) -> Result<Settings> {
        let contract = contract_flag
            .map(str::to_string)
            .or_else(|| env.contract_address.clone())
            .or_else(|| self.contract_address.clone())
            .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string());
        let contract_address =
            parse_account("contract", &contract).context("Invalid contract address")?;

        let rpc_url = rpc_flag
            .map(str::to_string)
            .or_else(|| env.rpc_url.clone())
            .or_else(|| self.rpc_url.clone())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        Ok(Settings {
            contract_address,
            rpc_url,
            private_key: env.private_key.clone(),
            status_timeout: Duration::from_millis(
                self.status_timeout_ms.unwrap_or(DEFAULT_STATUS_TIMEOUT_MS),
            ),
            scan_concurrency: self.scan_concurrency.unwrap_or(1).max(1),
            estimate_transfers: self.estimate_transfers,
        })
    }
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(ENV_CONFIG).map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("supplychain").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("supplychain").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "supplychain", "supplychain")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("supplychain"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("supplychain"));
    }
    directories::ProjectDirs::from("io", "supplychain", "supplychain")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Config::default()
            .resolve(&EnvOverrides::default(), None, None)
            .unwrap();
        assert_eq!(
            settings.contract_address.to_checksum(None),
            DEFAULT_CONTRACT_ADDRESS
        );
        assert_eq!(settings.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(settings.status_timeout, Duration::from_millis(5000));
        assert_eq!(settings.scan_concurrency, 1);
        assert!(!settings.estimate_transfers);
        assert!(settings.private_key.is_none());
    }

    #[test]
    fn test_precedence() {
        let config: Config = toml::from_str(
            r#"
            rpc_url = "http://file:8545"
            contract_address = "0x0000000000000000000000000000000000000001"
            scan_concurrency = 4
            estimate_transfers = true
            "#,
        )
        .unwrap();
        let env = EnvOverrides {
            rpc_url: Some("http://env:8545".into()),
            ..Default::default()
        };

        let settings = config.resolve(&env, None, None).unwrap();
        assert_eq!(settings.rpc_url, "http://env:8545");
        assert_eq!(settings.contract_address, Address::with_last_byte(1));
        assert_eq!(settings.scan_concurrency, 4);
        assert!(settings.estimate_transfers);

        let settings = config
            .resolve(&env, Some("ws://flag:8546"), None)
            .unwrap();
        assert_eq!(settings.rpc_url, "ws://flag:8546");
    }

    #[test]
    fn test_invalid_contract_address() {
        let result = Config::default().resolve(&EnvOverrides::default(), None, Some("0x123"));
        assert!(result.is_err());
    }
}
