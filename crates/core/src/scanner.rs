//! Scan cycle: enumerate loans, evaluate each, liquidate the eligible ones.
//!
//! One cycle reads the loan count, walks ids `0..count` in ascending order,
//! and hands every eligible loan to the submitter one at a time. A failure on
//! one loan is counted and the walk continues; only a failed count read ends
//! the cycle early.

use alloy::primitives::utils::format_ether;
use keeper_chain::{LiquidationSubmitter, Loan, LoanReader, SubmitOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::config::KeeperConfig;
use crate::evaluator::{days_overdue, is_eligible};
use crate::report::CycleReport;
use crate::retry::RetryPolicy;

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Pause after each submission while more ids remain
    pub inter_tx_delay: Duration,
    /// Retry policy for count and loan reads
    pub retry: RetryPolicy,
    /// Log eligible loans without submitting
    pub dry_run: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            inter_tx_delay: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }
}

impl From<&KeeperConfig> for ScannerConfig {
    fn from(cfg: &KeeperConfig) -> Self {
        Self {
            inter_tx_delay: cfg.scanner.inter_tx_delay(),
            retry: RetryPolicy::new(cfg.scanner.read_retries, cfg.scanner.retry_base_delay()),
            dry_run: cfg.scanner.dry_run,
        }
    }
}

/// Runs scan cycles against a loan source and a submitter.
pub struct Scanner {
    reader: Arc<dyn LoanReader>,
    submitter: Arc<dyn LiquidationSubmitter>,
    clock: Arc<dyn Clock>,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(
        reader: Arc<dyn LoanReader>,
        submitter: Arc<dyn LiquidationSubmitter>,
        clock: Arc<dyn Clock>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            reader,
            submitter,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run one full cycle. Always returns a report; errors are counted, not raised.
    #[instrument(skip(self), fields(dry_run = self.config.dry_run))]
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(cycle, self.clock.now());

        let count = match self
            .config
            .retry
            .run("loan_count", || self.reader.loan_count())
            .await
        {
            Ok(count) => count,
            Err(e) => {
                report.abort(e.to_string());
                report.elapsed = started.elapsed();
                report.log();
                return report;
            }
        };
        debug!(count, "Loan count read");

        for id in 0..count {
            let loan = match self.config.retry.run("loan", || self.reader.loan(id)).await {
                Ok(loan) => loan,
                Err(e) => {
                    warn!(loan_id = id, error = %e, "Failed to read loan, skipping");
                    report.error_count += 1;
                    continue;
                }
            };
            report.total_scanned += 1;

            // Read per loan so a long cycle does not judge late loans by a stale time
            let now = self.clock.now();
            if !is_eligible(&loan, now) {
                continue;
            }
            report.eligible_count += 1;
            log_eligible(&loan, now);

            if self.config.dry_run {
                info!(loan_id = id, "Dry run: liquidation not submitted");
                report.dry_run_skipped += 1;
                continue;
            }

            let outcome = self.submitter.submit(id).await;
            log_outcome(id, &outcome);
            report.record_outcome(&outcome);

            if id + 1 < count && !self.config.inter_tx_delay.is_zero() {
                tokio::time::sleep(self.config.inter_tx_delay).await;
            }
        }

        report.elapsed = started.elapsed();
        report.log();
        report
    }
}

fn log_eligible(loan: &Loan, now: u64) {
    info!(
        loan_id = loan.id,
        borrower = %loan.borrower,
        principal = %format_ether(loan.principal),
        days_overdue = days_overdue(loan, now).unwrap_or(0),
        "Loan eligible for liquidation"
    );
}

fn log_outcome(loan_id: u64, outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Liquidated {
            tx_hash,
            block_number,
            gas_used,
        } => info!(
            loan_id,
            tx_hash = %tx_hash,
            block = ?block_number,
            gas_used,
            "Loan liquidated"
        ),
        SubmitOutcome::AlreadyResolved { reason } => {
            info!(loan_id, reason = %reason, "Loan already resolved")
        }
        SubmitOutcome::Failed {
            kind,
            reason,
            tx_hash,
        } => warn!(
            loan_id,
            kind = %kind,
            reason = %reason,
            tx_hash = ?tx_hash,
            "Liquidation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::{loan, MockReader, MockSubmitter};
    use keeper_chain::{FailureKind, LoanStatus, RevertKind};

    const NOW: u64 = 1_720_000_000;

    fn scanner(reader: Arc<MockReader>, submitter: Arc<MockSubmitter>, config: ScannerConfig) -> Scanner {
        Scanner::new(reader, submitter, Arc::new(FixedClock(NOW)), config)
    }

    fn fast() -> ScannerConfig {
        ScannerConfig {
            inter_tx_delay: Duration::ZERO,
            retry: RetryPolicy::none(),
            dry_run: false,
        }
    }

    fn scenario_a() -> Vec<Loan> {
        vec![
            loan(0, LoanStatus::Funded, NOW - 1_000),
            loan(1, LoanStatus::Funded, NOW + 1_000),
            loan(2, LoanStatus::Repaid, NOW - 5_000),
        ]
    }

    #[tokio::test]
    async fn test_only_overdue_funded_loan_submitted() {
        let reader = Arc::new(MockReader::new(scenario_a()));
        let submitter = Arc::new(MockSubmitter::new());

        let report = scanner(reader.clone(), submitter.clone(), fast()).run_cycle(1).await;

        assert_eq!(report.total_scanned, 3);
        assert_eq!(report.eligible_count, 1);
        assert_eq!(report.liquidated_count, 1);
        assert_eq!(report.error_count, 0);
        assert_eq!(submitter.submitted(), vec![0]);
        assert_eq!(reader.reads(), vec![0, 1, 2]);
        assert!(!report.is_aborted());
    }

    #[tokio::test]
    async fn test_not_active_revert_counts_as_already_liquidated() {
        let reader = Arc::new(MockReader::new(vec![loan(0, LoanStatus::Funded, NOW - 1)]));
        let submitter = Arc::new(
            MockSubmitter::new().with_revert(0, "execution reverted: Loan is not active"),
        );

        let report = scanner(reader, submitter, fast()).run_cycle(1).await;

        assert_eq!(report.already_liquidated_count, 1);
        assert_eq!(report.liquidated_count, 0);
        assert_eq!(report.error_count, 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_counts_as_error() {
        let reader = Arc::new(MockReader::new(vec![loan(0, LoanStatus::Funded, NOW - 1)]));
        let submitter = Arc::new(MockSubmitter::new().with_revert(0, "insufficient funds"));

        let report = scanner(reader, submitter, fast()).run_cycle(1).await;

        assert_eq!(report.error_count, 1);
        assert_eq!(report.already_liquidated_count, 0);
        assert_eq!(report.liquidated_count, 0);
    }

    #[tokio::test]
    async fn test_count_failure_aborts_cycle() {
        let reader = Arc::new(MockReader::new(scenario_a()).count_fails(1));
        let submitter = Arc::new(MockSubmitter::new());

        let report = scanner(reader.clone(), submitter.clone(), fast()).run_cycle(7).await;

        assert!(report.is_aborted());
        assert_eq!(report.cycle, 7);
        assert_eq!(report.total_scanned, 0);
        assert_eq!(report.eligible_count, 0);
        assert!(reader.reads().is_empty());
        assert!(submitter.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_failure_recovered_by_retry() {
        let reader = Arc::new(MockReader::new(scenario_a()).count_fails(2));
        let submitter = Arc::new(MockSubmitter::new());
        let config = ScannerConfig {
            retry: RetryPolicy::new(2, Duration::from_millis(100)),
            ..fast()
        };

        let report = scanner(reader.clone(), submitter, config).run_cycle(1).await;

        assert!(!report.is_aborted());
        assert_eq!(reader.count_calls(), 3);
        assert_eq!(report.total_scanned, 3);
    }

    #[tokio::test]
    async fn test_single_read_failure_does_not_abort() {
        let loans = vec![
            loan(0, LoanStatus::Funded, NOW - 10),
            loan(1, LoanStatus::Funded, NOW + 10),
            loan(2, LoanStatus::Funded, NOW - 10),
            loan(3, LoanStatus::Defaulted, NOW - 10),
            loan(4, LoanStatus::Funded, NOW - 10),
        ];
        let reader = Arc::new(MockReader::new(loans).failing(2));
        let submitter = Arc::new(MockSubmitter::new());

        let report = scanner(reader.clone(), submitter.clone(), fast()).run_cycle(1).await;

        assert!(!report.is_aborted());
        assert_eq!(report.total_scanned, 4);
        assert!(report.error_count >= 1);
        assert_eq!(report.eligible_count, 2);
        assert_eq!(submitter.submitted(), vec![0, 4]);
        assert_eq!(reader.reads(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dry_run_submits_nothing() {
        let reader = Arc::new(MockReader::new(scenario_a()));
        let submitter = Arc::new(MockSubmitter::new());
        let config = ScannerConfig {
            dry_run: true,
            ..fast()
        };

        let report = scanner(reader, submitter.clone(), config).run_cycle(1).await;

        assert_eq!(report.eligible_count, 1);
        assert_eq!(report.dry_run_skipped, 1);
        assert_eq!(report.liquidated_count, 0);
        assert!(submitter.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submissions_follow_ascending_id_order() {
        let loans = (0..6).map(|id| loan(id, LoanStatus::Funded, NOW - 1)).collect();
        let reader = Arc::new(MockReader::new(loans));
        let submitter = Arc::new(
            MockSubmitter::new().with_outcome(
                3,
                SubmitOutcome::Failed {
                    kind: FailureKind::Rejected(RevertKind::GasTooLow),
                    reason: "intrinsic gas too low".into(),
                    tx_hash: None,
                },
            ),
        );

        let report = scanner(reader, submitter.clone(), fast()).run_cycle(1).await;

        assert_eq!(submitter.submitted(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(report.liquidated_count, 5);
        assert_eq!(report.error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_submissions() {
        let loans = (0..3).map(|id| loan(id, LoanStatus::Funded, NOW - 1)).collect();
        let reader = Arc::new(MockReader::new(loans));
        let submitter = Arc::new(MockSubmitter::new());
        let config = ScannerConfig {
            inter_tx_delay: Duration::from_secs(2),
            ..fast()
        };

        let start = tokio::time::Instant::now();
        scanner(reader, submitter, config).run_cycle(1).await;

        // No pause after the last id
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_empty_loan_set() {
        let reader = Arc::new(MockReader::new(Vec::new()));
        let submitter = Arc::new(MockSubmitter::new());

        let report = scanner(reader, submitter, fast()).run_cycle(1).await;

        assert!(!report.is_aborted());
        assert_eq!(report.total_scanned, 0);
        assert_eq!(report.error_count, 0);
    }

    #[test]
    fn test_config_from_profile() {
        let config = ScannerConfig::from(&KeeperConfig::testing());
        assert!(config.dry_run);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.inter_tx_delay, Duration::from_millis(250));
    }
}
