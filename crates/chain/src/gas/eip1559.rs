//! EIP-1559 gas pricing (base fee + priority fee).

use super::{GasError, GasParams, GasStrategy};
use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;

/// Headroom over the current base fee, so the tx survives a few full blocks.
const BASE_FEE_MULTIPLIER: u128 = 2;

/// EIP-1559 pricing with a hard cap on `maxFeePerGas`.
#[derive(Debug)]
pub struct Eip1559GasStrategy {
    /// Maximum fee per gas in wei.
    max_fee_cap: u128,
    /// Fixed priority fee; node suggestion when `None`.
    priority_fee: Option<u128>,
}

impl Eip1559GasStrategy {
    pub fn new(max_fee_cap: u128, priority_fee: Option<u128>) -> Self {
        Self {
            max_fee_cap,
            priority_fee,
        }
    }

    /// Build params from a base fee and priority fee, or refuse them.
    ///
    /// Refused only when even the current block's price (base + tip) is over
    /// the cap; the headroom above that is clamped instead.
    pub fn compute_params(&self, base_fee: u128, priority_fee: u128) -> Result<GasParams, GasError> {
        let floor = base_fee.saturating_add(priority_fee);
        if floor > self.max_fee_cap {
            return Err(GasError::AboveCap {
                price: floor,
                cap: self.max_fee_cap,
            });
        }

        let max_fee_per_gas = base_fee
            .saturating_mul(BASE_FEE_MULTIPLIER)
            .saturating_add(priority_fee)
            .min(self.max_fee_cap);

        Ok(GasParams::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas: priority_fee,
            base_fee,
        })
    }
}

#[async_trait]
impl GasStrategy for Eip1559GasStrategy {
    async fn fetch_params(&self, rpc_url: &Url) -> Result<GasParams, GasError> {
        let provider = ProviderBuilder::new().on_http(rpc_url.clone());

        let block = provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| GasError::Rpc(e.to_string()))?
            .ok_or_else(|| GasError::Rpc("latest block unavailable".to_string()))?;

        let base_fee = block
            .header
            .base_fee_per_gas
            .map(u128::from)
            .ok_or_else(|| GasError::Rpc("chain does not report a base fee".to_string()))?;

        let priority_fee = match self.priority_fee {
            Some(fee) => fee,
            None => provider
                .get_max_priority_fee_per_gas()
                .await
                .map_err(|e| GasError::Rpc(e.to_string()))?,
        };

        self.compute_params(base_fee, priority_fee)
    }

    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams) {
        match params {
            GasParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                ..
            } => {
                tx.set_max_fee_per_gas(*max_fee_per_gas);
                tx.set_max_priority_fee_per_gas(*max_priority_fee_per_gas);
            }
            GasParams::Legacy { gas_price } => {
                tx.set_max_fee_per_gas(*gas_price);
                tx.set_max_priority_fee_per_gas(self.priority_fee.unwrap_or(0).min(*gas_price));
            }
        }
    }

    fn strategy_name(&self) -> &'static str {
        "EIP-1559"
    }
}
