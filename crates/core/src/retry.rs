//! Retry policy for chain reads.

use keeper_chain::ChainError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Backoff doubles per attempt and stops growing after this many doublings.
const MAX_BACKOFF_SHIFT: u32 = 3;

/// Bounded exponential backoff for transient read failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay * (1u32 << shift)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    debug!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Transient read failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(10, Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1600));
        // Capped
        assert_eq!(policy.delay_for(9), Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_millis(200));

        let result = policy
            .run("loan_count", || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ChainError::Rpc("503".into()))
                } else {
                    Ok(7u64)
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let result: Result<u64, _> = policy
            .run("loan", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ChainError::Rpc("timeout".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(5, Duration::from_millis(10));

        let result: Result<u64, _> = policy
            .run("loan", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ChainError::Reverted {
                    reason: "LoanDoesNotExist".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(ChainError::Reverted { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
