//! Time source for eligibility decisions.

use chrono::Utc;

/// Supplies "now" as unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-epoch clocks clamp to zero, which makes nothing eligible
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        // 2023-11-14
        assert!(SystemClock.now() > 1_700_000_000);
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(42).now(), 42);
    }
}
