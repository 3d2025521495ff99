//! Read-only access to the lending contract.
//! Uses Alloy providers for type-safe RPC interactions.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use tracing::debug;

use crate::contract::ILendingProtocol;
use crate::error::ChainError;
use crate::loan::Loan;

/// Source of loan records.
///
/// Every call reflects chain state at call time; implementations must not
/// cache across calls since statuses change between scans.
#[async_trait]
pub trait LoanReader: Send + Sync {
    /// Total number of loans ever created. Ids are dense in `[0, count)`.
    async fn loan_count(&self) -> Result<u64, ChainError>;

    /// Fetch one loan by id. Out-of-range ids surface as an error.
    async fn loan(&self, id: u64) -> Result<Loan, ChainError>;
}

/// Parse an RPC endpoint.
pub(crate) fn parse_rpc_url(rpc_url: &str) -> Result<Url, ChainError> {
    rpc_url
        .parse()
        .map_err(|e| ChainError::InvalidUrl(format!("{rpc_url}: {e}")))
}

/// Loan reader backed by the lending contract over HTTP.
#[derive(Debug, Clone)]
pub struct ContractLoanReader {
    /// HTTP RPC endpoint
    rpc_url: Url,
    /// Lending contract address
    contract: Address,
}

impl ContractLoanReader {
    /// Create a reader without touching the network.
    pub fn new(rpc_url: &str, contract: Address) -> Result<Self, ChainError> {
        Ok(Self {
            rpc_url: parse_rpc_url(rpc_url)?,
            contract,
        })
    }

    /// Lending contract address.
    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// RPC endpoint.
    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Get current block number.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        Ok(provider.get_block_number().await?)
    }

    /// Get chain ID.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        Ok(provider.get_chain_id().await?)
    }

    /// Check if the endpoint is serving blocks.
    pub async fn health_check(&self) -> Result<bool, ChainError> {
        let block = self.block_number().await?;
        debug!(block = block, "Provider health check passed");
        Ok(block > 0)
    }
}

#[async_trait]
impl LoanReader for ContractLoanReader {
    async fn loan_count(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let lending = ILendingProtocol::new(self.contract, &provider);

        let count = lending.getLoanCount().call().await?._0;
        if count > U256::from(u64::MAX) {
            return Err(ChainError::Decode(format!("loan count {count} exceeds u64")));
        }

        Ok(count.to::<u64>())
    }

    async fn loan(&self, id: u64) -> Result<Loan, ChainError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let lending = ILendingProtocol::new(self.contract, &provider);

        let raw = lending.getLoan(U256::from(id)).call().await?._0;
        let loan = Loan::try_from(raw)?;
        if loan.id != id {
            return Err(ChainError::Decode(format!(
                "requested loan {id}, contract returned {}",
                loan.id
            )));
        }

        debug!(loan_id = id, status = %loan.status, due = loan.due_timestamp, "Loan fetched");
        Ok(loan)
    }
}
