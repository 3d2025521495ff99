//! Keeper configuration.
//!
//! - Runtime tuning (profiles, TOML files): [`KeeperConfig`]
//! - Chain connection from the environment: [`ChainSettings`]

mod keeper;
mod settings;

use thiserror::Error;

pub use keeper::{KeeperConfig, ScanConfig, SubmissionConfig, PROFILE_ENV};
pub use settings::{
    ChainSettings, CHAIN_ID, LENDING_CONTRACT, PRIVATE_KEY, RPC_URL, SCAN_INTERVAL_MINUTES,
};

/// Configuration problems. All are fatal at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to load config file {path}: {reason}")]
    File { path: String, reason: String },
}
