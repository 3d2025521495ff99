//! Keeper chain interaction layer.
//!
//! This crate provides:
//! - Lending contract bindings (`getLoanCount`, `getLoan`, `liquidateLoan`)
//! - The `Loan` snapshot model and status decoding
//! - A read-only loan reader over HTTP
//! - Revert reason extraction and classification
//! - Gas strategy abstraction (Legacy + EIP-1559) with a price cap
//! - Signing account and the liquidation submitter

pub mod contract;
mod error;
pub mod gas;
mod loan;
mod reader;
pub mod revert;
mod signer;
mod submitter;

pub use error::ChainError;
pub use gas::{create_gas_strategy, GasError, GasParams, GasPricing, GasStrategy};
pub use loan::{Loan, LoanStatus};
pub use reader::{ContractLoanReader, LoanReader};
pub use revert::{classify_revert, RevertKind};
pub use signer::SigningAccount;
pub use submitter::{
    ContractSubmitter, FailureKind, LiquidationSubmitter, MinedTx, RpcBackend, SendError,
    SubmitOutcome, SubmitterConfig, TxBackend,
};
