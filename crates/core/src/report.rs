//! Per-cycle scan report.
//!
//! Created at the start of a cycle, filled in as loans are handled, logged at
//! the end and then dropped. Nothing here outlives the cycle except the
//! scheduler's copy of the most recent report.

use keeper_chain::SubmitOutcome;
use std::time::Duration;
use tracing::{error, info, warn};

/// Counters for one scan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle sequence number (1-based)
    pub cycle: u64,
    /// Unix seconds when the cycle began
    pub started_at: u64,
    /// Wall time spent in the cycle
    pub elapsed: Duration,
    /// Loans read and evaluated
    pub total_scanned: u64,
    /// Loans that passed the eligibility check
    pub eligible_count: u64,
    pub liquidated_count: u64,
    /// Lost races and loans resolved between read and write
    pub already_liquidated_count: u64,
    /// Read failures plus failed submissions
    pub error_count: u64,
    /// Eligible loans not submitted because of dry-run mode
    pub dry_run_skipped: u64,
    /// Set when the loan count could not be read
    pub abort_reason: Option<String>,
}

impl CycleReport {
    pub fn new(cycle: u64, started_at: u64) -> Self {
        Self {
            cycle,
            started_at,
            ..Default::default()
        }
    }

    /// Whether the cycle failed before reading any loans.
    pub fn is_aborted(&self) -> bool {
        self.abort_reason.is_some()
    }

    /// Mark the cycle as failed at the count read.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.abort_reason = Some(reason.into());
    }

    /// Count a submission outcome.
    pub fn record_outcome(&mut self, outcome: &SubmitOutcome) {
        match outcome {
            SubmitOutcome::Liquidated { .. } => self.liquidated_count += 1,
            SubmitOutcome::AlreadyResolved { .. } => self.already_liquidated_count += 1,
            SubmitOutcome::Failed { .. } => self.error_count += 1,
        }
    }

    /// Emit the report as one structured log line.
    pub fn log(&self) {
        if let Some(reason) = &self.abort_reason {
            error!(
                cycle = self.cycle,
                elapsed_ms = self.elapsed.as_millis(),
                reason = %reason,
                "Scan cycle aborted: loan count unavailable"
            );
            return;
        }

        if self.error_count > 0 {
            warn!(
                cycle = self.cycle,
                elapsed_ms = self.elapsed.as_millis(),
                total_scanned = self.total_scanned,
                eligible = self.eligible_count,
                liquidated = self.liquidated_count,
                already_liquidated = self.already_liquidated_count,
                errors = self.error_count,
                dry_run_skipped = self.dry_run_skipped,
                "Scan cycle completed with errors"
            );
        } else {
            info!(
                cycle = self.cycle,
                elapsed_ms = self.elapsed.as_millis(),
                total_scanned = self.total_scanned,
                eligible = self.eligible_count,
                liquidated = self.liquidated_count,
                already_liquidated = self.already_liquidated_count,
                errors = self.error_count,
                dry_run_skipped = self.dry_run_skipped,
                "Scan cycle completed"
            );
        }
    }
}
