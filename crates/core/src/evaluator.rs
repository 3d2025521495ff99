//! Liquidation eligibility.
//!
//! Pure functions of a loan snapshot and a caller-supplied "now". No I/O and
//! no clock reads, so the rule can be tested without a chain.

use keeper_chain::{Loan, LoanStatus};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// A loan is eligible iff it is Funded and strictly past its due timestamp.
pub fn is_eligible(loan: &Loan, now: u64) -> bool {
    loan.status == LoanStatus::Funded && now > loan.due_timestamp
}

/// Whole days past due. `None` unless the loan is eligible.
pub fn days_overdue(loan: &Loan, now: u64) -> Option<u64> {
    is_eligible(loan, now).then(|| (now - loan.due_timestamp) / SECONDS_PER_DAY)
}
