//! Keeper runtime configuration with profile support.
//!
//! Provides centralized configuration for scan cadence, pacing, retries and
//! transaction submission, with named profiles (testing, production) and TOML
//! file loading.

use keeper_chain::{create_gas_strategy, GasPricing, GasStrategy, SubmitterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ConfigError;

/// Environment variable selecting a profile name or a TOML file path.
pub const PROFILE_ENV: &str = "KEEPER_PROFILE";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Scan cadence and pacing
    #[serde(default)]
    pub scanner: ScanConfig,

    /// Transaction submission
    #[serde(default)]
    pub submission: SubmissionConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Scan cadence, pacing and read retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Minutes between scan cycles
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Pause after each submission attempt (milliseconds)
    #[serde(default = "default_inter_tx_delay")]
    pub inter_tx_delay_ms: u64,

    /// Extra attempts for a transient read failure
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// First retry delay (milliseconds), doubled per attempt
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Evaluate and log, but never submit
    #[serde(default)]
    pub dry_run: bool,
}

fn default_interval_minutes() -> u64 {
    5
}
fn default_inter_tx_delay() -> u64 {
    2_000
}
fn default_read_retries() -> u32 {
    2
}
fn default_retry_base_delay() -> u64 {
    200
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            inter_tx_delay_ms: default_inter_tx_delay(),
            read_retries: default_read_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            dry_run: false,
        }
    }
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
    pub fn inter_tx_delay(&self) -> Duration {
        Duration::from_millis(self.inter_tx_delay_ms)
    }
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Transaction submission parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Simulate with eth_call before sending
    #[serde(default = "default_simulate_first")]
    pub simulate_first: bool,

    /// Confirmations to wait for
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Receipt wait timeout (seconds)
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Fixed gas limit; node estimate when absent
    #[serde(default)]
    pub gas_limit: Option<u64>,

    /// Gas pricing model
    #[serde(default)]
    pub gas_pricing: GasPricing,

    /// Maximum gas price willing to pay (gwei)
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,

    /// Fixed EIP-1559 priority fee (gwei); node suggestion when absent
    #[serde(default)]
    pub priority_fee_gwei: Option<f64>,
}

fn default_simulate_first() -> bool {
    true
}
fn default_confirmations() -> u64 {
    1
}
fn default_confirmation_timeout() -> u64 {
    180
}
fn default_max_gas_price() -> f64 {
    200.0
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            simulate_first: default_simulate_first(),
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            gas_limit: None,
            gas_pricing: GasPricing::default(),
            max_gas_price_gwei: default_max_gas_price(),
            priority_fee_gwei: None,
        }
    }
}

impl SubmissionConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            scanner: ScanConfig::default(),
            submission: SubmissionConfig::default(),
        }
    }
}

impl KeeperConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::File { reason, .. } => ConfigError::File {
                path: path.to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::File {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fast cadence, dry run, no gas wasted while testing against a devnet.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            scanner: ScanConfig {
                interval_minutes: 1,
                inter_tx_delay_ms: 250,
                read_retries: 1,
                retry_base_delay_ms: 100,
                dry_run: true,
            },
            submission: SubmissionConfig {
                confirmation_timeout_secs: 60,
                ..Default::default()
            },
        }
    }

    /// Conservative settings for mainnet.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            scanner: ScanConfig {
                interval_minutes: 5,
                inter_tx_delay_ms: 5_000,
                read_retries: 3,
                retry_base_delay_ms: 500,
                dry_run: false,
            },
            submission: SubmissionConfig {
                simulate_first: true,
                confirmations: 2,
                confirmation_timeout_secs: 300,
                gas_limit: Some(400_000),
                gas_pricing: GasPricing::Eip1559,
                max_gas_price_gwei: 150.0,
                priority_fee_gwei: Some(1.5),
            },
        }
    }

    /// Resolve a profile name or TOML file path.
    pub fn from_profile(profile: &str) -> Result<Self, ConfigError> {
        match profile.to_lowercase().as_str() {
            "testing" | "test" => Ok(Self::testing()),
            "production" | "prod" => Ok(Self::production()),
            "default" | "" => Ok(Self::default()),
            _ if profile.ends_with(".toml") => Self::from_file(profile),
            other => Err(ConfigError::Invalid {
                var: PROFILE_ENV,
                reason: format!("unknown profile '{other}'"),
            }),
        }
    }

    /// Get profile from `KEEPER_PROFILE`, or default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = std::env::var(PROFILE_ENV).unwrap_or_default();
        Self::from_profile(&profile)
    }

    /// Reject values that would make the keeper misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                var: "scanner.interval_minutes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.submission.confirmation_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "submission.confirmation_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        let cap = self.submission.max_gas_price_gwei;
        if !cap.is_finite() || cap <= 0.0 {
            return Err(ConfigError::Invalid {
                var: "submission.max_gas_price_gwei",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Apply an interval override from the environment.
    pub fn with_interval_minutes(mut self, minutes: Option<u64>) -> Self {
        if let Some(minutes) = minutes {
            self.scanner.interval_minutes = minutes;
        }
        self
    }

    /// Submitter settings for [`keeper_chain::ContractSubmitter`].
    pub fn submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            simulate_first: self.submission.simulate_first,
            confirmations: self.submission.confirmations,
            confirmation_timeout: self.submission.confirmation_timeout(),
            gas_limit: self.submission.gas_limit,
        }
    }

    /// Gas strategy for the configured pricing model and cap.
    pub fn gas_strategy(&self) -> Box<dyn GasStrategy> {
        create_gas_strategy(
            self.submission.gas_pricing,
            self.submission.max_gas_price_gwei,
            self.submission.priority_fee_gwei,
        )
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Keeper configuration loaded");
        tracing::info!(
            interval_minutes = self.scanner.interval_minutes,
            inter_tx_delay_ms = self.scanner.inter_tx_delay_ms,
            read_retries = self.scanner.read_retries,
            dry_run = self.scanner.dry_run,
            "Scanner settings"
        );
        tracing::info!(
            simulate_first = self.submission.simulate_first,
            confirmations = self.submission.confirmations,
            timeout_secs = self.submission.confirmation_timeout_secs,
            gas_pricing = ?self.submission.gas_pricing,
            max_gas_price_gwei = self.submission.max_gas_price_gwei,
            "Submission settings"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KeeperConfig::default();
        assert_eq!(config.scanner.interval_minutes, 5);
        assert_eq!(config.scanner.interval(), Duration::from_secs(300));
        assert!(config.submission.simulate_first);
        assert!(!config.scanner.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profiles() {
        assert!(KeeperConfig::from_profile("testing").unwrap().scanner.dry_run);
        assert_eq!(
            KeeperConfig::from_profile("PROD").unwrap().submission.gas_pricing,
            GasPricing::Eip1559
        );
        assert_eq!(KeeperConfig::from_profile("").unwrap().profile, "default");
        assert!(KeeperConfig::from_profile("turbo").is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = KeeperConfig::from_toml(
            r#"
            profile = "custom"

            [scanner]
            interval_minutes = 10
            dry_run = true

            [submission]
            gas_pricing = "eip1559"
            max_gas_price_gwei = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(config.profile, "custom");
        assert_eq!(config.scanner.interval_minutes, 10);
        assert_eq!(config.scanner.inter_tx_delay_ms, 2_000);
        assert!(config.scanner.dry_run);
        assert_eq!(config.submission.gas_pricing, GasPricing::Eip1559);
        assert_eq!(config.submission.confirmations, 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = KeeperConfig::from_toml("[scanner]\ninterval_minutes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "scanner.interval_minutes", .. }));
    }

    #[test]
    fn test_serialization() {
        let config = KeeperConfig::production();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("profile = \"production\""));
        assert!(toml_str.contains("gas_pricing = \"eip1559\""));

        let parsed = KeeperConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_converters() {
        let config = KeeperConfig::production().with_interval_minutes(Some(2));
        assert_eq!(config.scanner.interval(), Duration::from_secs(120));

        let submitter = config.submitter_config();
        assert_eq!(submitter.confirmations, 2);
        assert_eq!(submitter.confirmation_timeout, Duration::from_secs(300));
        assert_eq!(submitter.gas_limit, Some(400_000));
        assert_eq!(config.gas_strategy().strategy_name(), "EIP-1559");

        let unchanged = KeeperConfig::default().with_interval_minutes(None);
        assert_eq!(unchanged.scanner.interval_minutes, 5);
    }

    #[test]
    fn test_missing_file() {
        let err = KeeperConfig::from_profile("/nonexistent/keeper.toml").unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
    }
}
