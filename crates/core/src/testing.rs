//! In-memory chain doubles for unit tests.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use keeper_chain::{ChainError, LiquidationSubmitter, Loan, LoanReader, LoanStatus, SubmitOutcome};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Loan with placeholder fields apart from those that drive eligibility.
pub fn loan(id: u64, status: LoanStatus, due_timestamp: u64) -> Loan {
    Loan {
        id,
        collateral_id: U256::from(id + 100),
        borrower: Address::with_last_byte(0xb0),
        lender: Address::with_last_byte(0x1e),
        principal: U256::from(1_500u64) * U256::from(10u64).pow(U256::from(18u64)),
        funding_timestamp: due_timestamp.saturating_sub(365 * 86_400),
        due_timestamp,
        term_months: 12,
        status,
    }
}

/// Reader over a fixed loan set.
#[derive(Default)]
pub struct MockReader {
    loans: Vec<Loan>,
    failing: HashSet<u64>,
    count_errors: Mutex<VecDeque<ChainError>>,
    count_delay: Duration,
    reads: Mutex<Vec<u64>>,
    count_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockReader {
    pub fn new(loans: Vec<Loan>) -> Self {
        Self {
            loans,
            ..Default::default()
        }
    }

    /// Every read of `id` fails with an RPC error.
    pub fn failing(mut self, id: u64) -> Self {
        self.failing.insert(id);
        self
    }

    /// The next `times` count reads fail with an RPC error.
    pub fn count_fails(self, times: usize) -> Self {
        {
            let mut errors = self.count_errors.lock();
            for _ in 0..times {
                errors.push_back(ChainError::Rpc("connection refused".into()));
            }
        }
        self
    }

    /// Count reads take this long.
    pub fn count_delay(mut self, delay: Duration) -> Self {
        self.count_delay = delay;
        self
    }

    /// Ids read, in call order.
    pub fn reads(&self) -> Vec<u64> {
        self.reads.lock().clone()
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    /// Highest number of count reads observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoanReader for MockReader {
    async fn loan_count(&self) -> Result<u64, ChainError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.count_delay.is_zero() {
            tokio::time::sleep(self.count_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.count_errors.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(self.loans.len() as u64),
        }
    }

    async fn loan(&self, id: u64) -> Result<Loan, ChainError> {
        self.reads.lock().push(id);
        if self.failing.contains(&id) {
            return Err(ChainError::Rpc(format!("getLoan({id}) timed out")));
        }
        self.loans
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| ChainError::Reverted {
                reason: "LoanDoesNotExist".into(),
            })
    }
}

/// Submitter returning scripted outcomes. Unscripted ids succeed.
#[derive(Default)]
pub struct MockSubmitter {
    outcomes: HashMap<u64, SubmitOutcome>,
    submitted: Mutex<Vec<u64>>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, id: u64, outcome: SubmitOutcome) -> Self {
        self.outcomes.insert(id, outcome);
        self
    }

    /// Script a revert reason, classified the same way the contract submitter does.
    pub fn with_revert(self, id: u64, reason: &str) -> Self {
        self.with_outcome(id, SubmitOutcome::from_revert(reason, None))
    }

    pub fn submitted(&self) -> Vec<u64> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl LiquidationSubmitter for MockSubmitter {
    async fn submit(&self, loan_id: u64) -> SubmitOutcome {
        self.submitted.lock().push(loan_id);
        self.outcomes
            .get(&loan_id)
            .cloned()
            .unwrap_or(SubmitOutcome::Liquidated {
                tx_hash: B256::with_last_byte(loan_id as u8),
                block_number: Some(1_000 + loan_id),
                gas_used: 85_000,
            })
    }
}
