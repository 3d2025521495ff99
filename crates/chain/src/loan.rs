//! Loan snapshot as seen by the keeper.

use alloy::primitives::{Address, U256};
use std::fmt;

use crate::contract;
use crate::error::ChainError;

/// Loan lifecycle status. Owned by the contract; the keeper only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoanStatus {
    Requested = 0,
    Funded = 1,
    Repaid = 2,
    Defaulted = 3,
}

impl TryFrom<u8> for LoanStatus {
    type Error = ChainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LoanStatus::Requested),
            1 => Ok(LoanStatus::Funded),
            2 => Ok(LoanStatus::Repaid),
            3 => Ok(LoanStatus::Defaulted),
            other => Err(ChainError::Decode(format!("unknown loan status {other}"))),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoanStatus::Requested => "Requested",
            LoanStatus::Funded => "Funded",
            LoanStatus::Repaid => "Repaid",
            LoanStatus::Defaulted => "Defaulted",
        };
        f.write_str(name)
    }
}

/// A single loan record read from the lending contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub id: u64,
    pub collateral_id: U256,
    pub borrower: Address,
    pub lender: Address,
    /// Principal in base-currency wei (18 decimals)
    pub principal: U256,
    /// Unix seconds
    pub funding_timestamp: u64,
    /// Unix seconds
    pub due_timestamp: u64,
    /// Informational only
    pub term_months: u32,
    pub status: LoanStatus,
}

impl TryFrom<contract::Loan> for Loan {
    type Error = ChainError;

    fn try_from(raw: contract::Loan) -> Result<Self, Self::Error> {
        if raw.id > U256::from(u64::MAX) {
            return Err(ChainError::Decode(format!("loan id {} exceeds u64", raw.id)));
        }
        let id = raw.id.to::<u64>();

        Ok(Self {
            id,
            collateral_id: raw.collateralId,
            borrower: raw.borrower,
            lender: raw.lender,
            principal: raw.principal,
            // Saturate: a due date past u64::MAX is simply never reached
            funding_timestamp: raw.fundingTimestamp.saturating_to::<u64>(),
            due_timestamp: raw.dueTimestamp.saturating_to::<u64>(),
            term_months: raw.termMonths.saturating_to::<u32>(),
            status: LoanStatus::try_from(raw.status)?,
        })
    }
}
