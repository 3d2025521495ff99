//! Revert reason extraction and classification.
//!
//! Telling a lost liquidation race apart from a genuine failure relies on
//! the text (or custom error) a rejected call carries. All of that matching
//! lives here, in one ordered table. Anything the table does not recognise is
//! `Unknown`, which the submitter reports as a failure.

use alloy::sol_types::{decode_revert_reason, SolError};
use alloy::transports::TransportError;
use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::contract::ILendingProtocol;

/// Classification of a revert reason or node rejection message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevertKind {
    /// Loan is no longer Funded: another keeper won, or it was repaid.
    AlreadyResolved,
    /// Contract clock says the loan is not overdue yet.
    NotYetDue,
    /// Signing account cannot pay for the transaction.
    InsufficientFunds,
    /// Gas limit too low for the call.
    GasTooLow,
    /// Nonce collision on the signing account.
    NonceConflict,
    /// Nothing in the table matched.
    Unknown,
}

impl RevertKind {
    /// Only a lost race (or a concurrent repayment) is an expected outcome.
    pub fn is_already_resolved(&self) -> bool {
        matches!(self, RevertKind::AlreadyResolved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RevertKind::AlreadyResolved => "already_resolved",
            RevertKind::NotYetDue => "not_yet_due",
            RevertKind::InsufficientFunds => "insufficient_funds",
            RevertKind::GasTooLow => "gas_too_low",
            RevertKind::NonceConflict => "nonce_conflict",
            RevertKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RevertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known revert signatures, matched case-insensitively in order.
const SIGNATURES: &[(&str, RevertKind)] = &[
    (r"loan (is )?not active", RevertKind::AlreadyResolved),
    (r"loannotactive", RevertKind::AlreadyResolved),
    (r"not funded", RevertKind::AlreadyResolved),
    (r"already liquidated", RevertKind::AlreadyResolved),
    (r"already defaulted", RevertKind::AlreadyResolved),
    (r"already repaid", RevertKind::AlreadyResolved),
    (r"invalid loan status", RevertKind::AlreadyResolved),
    (r"not overdue", RevertKind::NotYetDue),
    (r"loannotoverdue", RevertKind::NotYetDue),
    (r"not yet due", RevertKind::NotYetDue),
    (r"loan not due", RevertKind::NotYetDue),
    (r"insufficient (funds|balance)", RevertKind::InsufficientFunds),
    (r"intrinsic gas too low", RevertKind::GasTooLow),
    (r"out of gas", RevertKind::GasTooLow),
    (r"gas required exceeds allowance", RevertKind::GasTooLow),
    (r"nonce too low", RevertKind::NonceConflict),
    (r"replacement transaction underpriced", RevertKind::NonceConflict),
    (r"already known", RevertKind::NonceConflict),
];

/// Custom errors declared by the lending contract, by selector.
const CUSTOM_ERRORS: &[([u8; 4], &str)] = &[
    (ILendingProtocol::LoanNotActive::SELECTOR, "LoanNotActive"),
    (ILendingProtocol::LoanNotOverdue::SELECTOR, "LoanNotOverdue"),
    (ILendingProtocol::LoanDoesNotExist::SELECTOR, "LoanDoesNotExist"),
];

fn signature_table() -> &'static [(Regex, RevertKind)] {
    static TABLE: OnceLock<Vec<(Regex, RevertKind)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SIGNATURES
            .iter()
            .filter_map(|(pattern, kind)| {
                Regex::new(&format!("(?i){pattern}"))
                    .ok()
                    .map(|re| (re, *kind))
            })
            .collect()
    })
}

/// Classify a revert reason or node error message.
pub fn classify_revert(reason: &str) -> RevertKind {
    signature_table()
        .iter()
        .find(|(re, _)| re.is_match(reason))
        .map(|(_, kind)| *kind)
        .unwrap_or(RevertKind::Unknown)
}

/// Decode raw revert data: custom errors first, then `Error(string)` / `Panic(uint256)`.
pub fn decode_revert_data(data: &[u8]) -> Option<String> {
    if data.len() >= 4 {
        if let Some((_, name)) = CUSTOM_ERRORS.iter().find(|(sel, _)| data[..4] == sel[..]) {
            return Some((*name).to_string());
        }
    }
    decode_revert_reason(data)
}

/// JSON-RPC error code geth and anvil use for `execution reverted`.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Revert reason from a transport error, if the node reported a revert.
///
/// Node-side failures that are not reverts (rate limits, missing headers,
/// request timeouts) return `None` so callers treat them as transport errors.
pub fn transport_revert_reason(err: &TransportError) -> Option<String> {
    let payload = err.as_error_resp()?;
    if let Some(data) = payload.as_revert_data() {
        return Some(decode_revert_data(&data).unwrap_or_else(|| payload.message.to_string()));
    }

    let message = payload.message.as_ref();
    let reverted = payload.code == EXECUTION_REVERTED_CODE
        || message.to_ascii_lowercase().contains("execution reverted");
    reverted.then(|| message.to_string())
}

/// Best-effort revert reason from a contract call error.
pub fn revert_reason(err: &alloy::contract::Error) -> Option<String> {
    match err {
        alloy::contract::Error::TransportError(e) => transport_revert_reason(e),
        _ => None,
    }
}
