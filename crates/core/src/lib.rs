//! Keeper core logic.
//!
//! This crate provides the chain-agnostic side of the liquidation keeper:
//! - Eligibility rule for overdue loans
//! - Scan cycle orchestration and per-cycle reports
//! - Single-flight periodic scheduling
//! - Runtime configuration (profiles, TOML files, environment)

mod clock;
pub mod config;
pub mod evaluator;
mod report;
mod retry;
mod scanner;
mod scheduler;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ChainSettings, ConfigError, KeeperConfig};
pub use evaluator::{days_overdue, is_eligible};
pub use report::CycleReport;
pub use retry::RetryPolicy;
pub use scanner::{Scanner, ScannerConfig};
pub use scheduler::{Scheduler, SchedulerError, SchedulerState};
