//! Signing account for liquidation transactions.
//!
//! The keeper has exactly one signing key. It is only ever used from the
//! sequential scan loop, so nonces are assigned by the node's pending count
//! without local bookkeeping.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use tracing::info;

use crate::error::ChainError;
use crate::reader::parse_rpc_url;

/// Wallet plus the endpoint it sends through.
#[derive(Clone)]
pub struct SigningAccount {
    /// RPC URL for sending transactions
    rpc_url: Url,
    /// Signer wallet
    wallet: EthereumWallet,
    /// Signer address
    address: Address,
}

impl SigningAccount {
    /// Load a private key (with or without `0x` prefix).
    pub fn from_private_key(private_key: &str, rpc_url: &str) -> Result<Self, ChainError> {
        let key_str = private_key.trim().trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str
            .parse()
            .map_err(|_| ChainError::Decode("private key is not a valid secp256k1 key".to_string()))?;
        let address = signer.address();

        info!(address = %address, "Signing account loaded");

        Ok(Self {
            rpc_url: parse_rpc_url(rpc_url)?,
            wallet: EthereumWallet::from(signer),
            address,
        })
    }

    /// Keeper address that pays for liquidations.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Endpoint transactions are sent to.
    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Wallet used by signing providers.
    pub fn wallet(&self) -> EthereumWallet {
        self.wallet.clone()
    }

    /// Native balance of the keeper address.
    pub async fn balance(&self) -> Result<U256, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        Ok(provider.get_balance(self.address).await?)
    }

    /// Pending nonce of the keeper address.
    pub async fn nonce(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        Ok(provider.get_transaction_count(self.address).pending().await?)
    }
}

impl std::fmt::Debug for SigningAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningAccount")
            .field("address", &self.address)
            .field("rpc_url", &self.rpc_url.as_str())
            .finish_non_exhaustive()
    }
}
