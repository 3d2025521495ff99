//! Periodic scan scheduling.
//!
//! At most one cycle is ever in flight. The loop awaits each cycle to
//! completion before waiting for the next tick, and ticks that fall due while
//! a cycle is running are skipped rather than queued. `run_once` shares the
//! same guard, so an ad-hoc cycle never overlaps a scheduled one.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::report::CycleReport;
use crate::scanner::Scanner;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Stop requested; the in-flight cycle is finishing
    Stopping,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler is already {0}")]
    AlreadyRunning(SchedulerState),
    #[error("scan interval must be non-zero")]
    ZeroInterval,
}

/// Drives a [`Scanner`] on a fixed interval.
pub struct Scheduler {
    scanner: Scanner,
    state: Mutex<SchedulerState>,
    /// Held for the duration of a cycle
    cycle_guard: tokio::sync::Mutex<()>,
    stop_tx: watch::Sender<bool>,
    cycles: AtomicU64,
    last_report: Mutex<Option<CycleReport>>,
}

impl Scheduler {
    pub fn new(scanner: Scanner) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            scanner,
            state: Mutex::new(SchedulerState::Idle),
            cycle_guard: tokio::sync::Mutex::new(()),
            stop_tx,
            cycles: AtomicU64::new(0),
            last_report: Mutex::new(None),
        }
    }

    /// Start the periodic loop. The first cycle runs immediately.
    pub fn start(self: &Arc<Self>, every: Duration) -> Result<JoinHandle<()>, SchedulerError> {
        if every.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        {
            let mut state = self.state.lock();
            if *state != SchedulerState::Idle {
                return Err(SchedulerError::AlreadyRunning(*state));
            }
            *state = SchedulerState::Running;
        }
        self.stop_tx.send_replace(false);

        info!(interval_secs = every.as_secs(), "Scheduler started");
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.run_loop(every).await }))
    }

    async fn run_loop(self: Arc<Self>, every: Duration) {
        let mut stop_rx = self.stop_tx.subscribe();
        // Resolves to () so no borrow of the watch value is held across a cycle
        let stop_requested = async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        };
        let mut stop_requested = std::pin::pin!(stop_requested);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop_requested => break,
                _ = ticker.tick() => {
                    // Not raced against stop: a started cycle always finishes
                    if self.run_once().await.is_none() {
                        debug!("Tick skipped, a cycle is already running");
                    }
                }
            }
            if *self.stop_tx.borrow() {
                break;
            }
        }

        *self.state.lock() = SchedulerState::Idle;
        info!(cycles = self.cycles_completed(), "Scheduler stopped");
    }

    /// Ask the loop to exit after the in-flight cycle, if any.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state != SchedulerState::Running {
                return;
            }
            *state = SchedulerState::Stopping;
        }
        info!("Scheduler stop requested");
        self.stop_tx.send_replace(true);
    }

    /// Run a single cycle now. Returns `None` if one is already in flight.
    pub async fn run_once(&self) -> Option<CycleReport> {
        let _guard = self.cycle_guard.try_lock().ok()?;
        let cycle = self.cycles.load(Ordering::SeqCst) + 1;
        let report = self.scanner.run_cycle(cycle).await;
        self.cycles.store(cycle, Ordering::SeqCst);
        *self.last_report.lock() = Some(report.clone());
        Some(report)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Most recent completed cycle, aborted ones included.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.lock().clone()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }
}
