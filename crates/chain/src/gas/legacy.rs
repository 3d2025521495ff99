//! Legacy gas pricing (single `gasPrice`).

use super::{GasError, GasParams, GasStrategy};
use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;

/// Legacy gas pricing with a hard cap.
#[derive(Debug)]
pub struct LegacyGasStrategy {
    /// Maximum gas price in wei.
    max_gas_price: u128,
}

impl LegacyGasStrategy {
    pub fn new(max_gas_price: u128) -> Self {
        Self { max_gas_price }
    }

    /// Accept a quoted network price or refuse it.
    pub fn check_price(&self, gas_price: u128) -> Result<GasParams, GasError> {
        if gas_price > self.max_gas_price {
            return Err(GasError::AboveCap {
                price: gas_price,
                cap: self.max_gas_price,
            });
        }
        Ok(GasParams::Legacy { gas_price })
    }
}

#[async_trait]
impl GasStrategy for LegacyGasStrategy {
    async fn fetch_params(&self, rpc_url: &Url) -> Result<GasParams, GasError> {
        let provider = ProviderBuilder::new().on_http(rpc_url.clone());
        let gas_price = provider
            .get_gas_price()
            .await
            .map_err(|e| GasError::Rpc(e.to_string()))?;

        self.check_price(gas_price)
    }

    fn apply_gas(&self, tx: &mut TransactionRequest, params: &GasParams) {
        tx.set_gas_price(params.effective_gas_price());
    }

    fn strategy_name(&self) -> &'static str {
        "Legacy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn test_price_under_cap() {
        let strategy = LegacyGasStrategy::new(10_000_000_000);
        assert_eq!(
            strategy.check_price(2_000_000_000),
            Ok(GasParams::Legacy {
                gas_price: 2_000_000_000
            })
        );
        // Equal to cap is accepted
        assert!(strategy.check_price(10_000_000_000).is_ok());
    }

    #[test]
    fn test_price_above_cap() {
        let strategy = LegacyGasStrategy::new(10_000_000_000);
        assert_eq!(
            strategy.check_price(10_000_000_001),
            Err(GasError::AboveCap {
                price: 10_000_000_001,
                cap: 10_000_000_000
            })
        );
    }

    #[test]
    fn test_apply_gas() {
        let strategy = LegacyGasStrategy::new(10_000_000_000);
        let mut tx = TransactionRequest::default().with_to(Address::ZERO);
        strategy.apply_gas(
            &mut tx,
            &GasParams::Legacy {
                gas_price: 5_000_000_000,
            },
        );
        assert_eq!(tx.gas_price, Some(5_000_000_000));
        assert_eq!(tx.max_fee_per_gas, None);
    }
}
