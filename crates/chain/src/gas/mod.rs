//! Gas pricing for liquidation transactions.
//!
//! Both strategies enforce a hard price cap: when the network asks for more
//! than the keeper is configured to pay, no transaction is sent at all.

mod eip1559;
mod legacy;

pub use eip1559::Eip1559GasStrategy;
pub use legacy::LegacyGasStrategy;

use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

const WEI_PER_GWEI: f64 = 1e9;

/// Convert a gwei amount from config into wei.
pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei.max(0.0) * WEI_PER_GWEI) as u128
}

/// Transaction pricing model of the target chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasPricing {
    /// Single `gasPrice` field
    #[default]
    Legacy,
    /// Base fee plus priority fee
    Eip1559,
}

/// Gas parameters quoted from the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasParams {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
        base_fee: u128,
    },
}

impl GasParams {
    /// Worst-case price per gas unit.
    pub fn effective_gas_price(&self) -> u128 {
        match self {
            GasParams::Legacy { gas_price } => *gas_price,
            GasParams::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// Why a gas quote could not be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GasError {
    #[error("gas price {price} wei above cap {cap} wei")]
    AboveCap { price: u128, cap: u128 },

    #[error("gas quote failed: {0}")]
    Rpc(String),
}

/// Gas pricing strategy.
#[async_trait]
pub trait GasStrategy: Send + Sync + Debug {
    /// Quote current gas parameters, refusing prices above the cap.
    async fn fetch_params(&self, rpc_url: &Url) -> Result<GasParams, GasError>;

    /// Write the quoted parameters into a transaction request.
    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams);

    /// Strategy name for logging.
    fn strategy_name(&self) -> &'static str;
}

/// Build a strategy from configuration values.
pub fn create_gas_strategy(
    pricing: GasPricing,
    max_gas_price_gwei: f64,
    priority_fee_gwei: Option<f64>,
) -> Box<dyn GasStrategy> {
    let cap = gwei_to_wei(max_gas_price_gwei);
    match pricing {
        GasPricing::Legacy => Box::new(LegacyGasStrategy::new(cap)),
        GasPricing::Eip1559 => Box::new(Eip1559GasStrategy::new(
            cap,
            priority_fee_gwei.map(gwei_to_wei),
        )),
    }
}
