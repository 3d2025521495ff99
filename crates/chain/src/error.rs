//! Errors surfaced by chain reads.

use thiserror::Error;

/// Failure talking to the lending contract.
///
/// "Loan not eligible" is never an error; these only describe reads that
/// could not produce a trustworthy record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Transport or node failure (timeouts, connection resets, 5xx).
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The contract rejected the read, e.g. an out-of-range loan id.
    #[error("contract reverted: {reason}")]
    Reverted { reason: String },

    /// The returned data could not be mapped onto a loan.
    #[error("decode error: {0}")]
    Decode(String),

    /// The configured endpoint is not a valid URL.
    #[error("invalid rpc url: {0}")]
    InvalidUrl(String),
}

impl ChainError {
    /// Whether retrying the same read may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Rpc(_))
    }
}

impl From<alloy::contract::Error> for ChainError {
    fn from(err: alloy::contract::Error) -> Self {
        match crate::revert::revert_reason(&err) {
            Some(reason) => ChainError::Reverted { reason },
            None => ChainError::Rpc(err.to_string()),
        }
    }
}

impl From<alloy::transports::TransportError> for ChainError {
    fn from(err: alloy::transports::TransportError) -> Self {
        match crate::revert::transport_revert_reason(&err) {
            Some(reason) => ChainError::Reverted { reason },
            None => ChainError::Rpc(err.to_string()),
        }
    }
}
