//! Chain connection settings read from the environment.

use alloy::primitives::Address;
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

pub const RPC_URL: &str = "RPC_URL";
pub const LENDING_CONTRACT: &str = "LENDING_CONTRACT";
pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const CHAIN_ID: &str = "CHAIN_ID";
pub const SCAN_INTERVAL_MINUTES: &str = "SCAN_INTERVAL_MINUTES";

/// Endpoint, contract and signing key. All required values are checked at
/// startup so a misconfigured keeper never reaches the scheduler.
#[derive(Clone)]
pub struct ChainSettings {
    pub rpc_url: String,
    pub lending_contract: Address,
    private_key: String,
    /// Expected chain id, checked against the node when set
    pub chain_id: Option<u64>,
    /// Overrides the profile's scan interval when set
    pub interval_minutes: Option<u64>,
}

impl ChainSettings {
    /// Read settings from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns `None` for unset names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let rpc_url = required(RPC_URL)?;
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: RPC_URL,
                reason: format!("expected an http(s) URL, got '{rpc_url}'"),
            });
        }

        let contract_str = required(LENDING_CONTRACT)?;
        let lending_contract =
            Address::from_str(&contract_str).map_err(|e| ConfigError::Invalid {
                var: LENDING_CONTRACT,
                reason: e.to_string(),
            })?;

        let private_key = required(PRIVATE_KEY)?;

        let chain_id = optional(CHAIN_ID)
            .map(|v| {
                v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    var: CHAIN_ID,
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let interval_minutes = optional(SCAN_INTERVAL_MINUTES)
            .map(|v| match v.parse::<u64>() {
                Ok(0) => Err(ConfigError::Invalid {
                    var: SCAN_INTERVAL_MINUTES,
                    reason: "must be at least 1".to_string(),
                }),
                Ok(n) => Ok(n),
                Err(e) => Err(ConfigError::Invalid {
                    var: SCAN_INTERVAL_MINUTES,
                    reason: e.to_string(),
                }),
            })
            .transpose()?;

        Ok(Self {
            rpc_url,
            lending_contract,
            private_key,
            chain_id,
            interval_minutes,
        })
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for ChainSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainSettings")
            .field("rpc_url", &self.rpc_url)
            .field("lending_contract", &self.lending_contract)
            .field("private_key", &"<redacted>")
            .field("chain_id", &self.chain_id)
            .field("interval_minutes", &self.interval_minutes)
            .finish()
    }
}
