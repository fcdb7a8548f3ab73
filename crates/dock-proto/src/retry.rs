use std::time::Duration;

/// Linear backoff for transient network failures.
///
/// `max_retries` counts retries, not attempts: a call makes at most
/// `1 + max_retries` attempts. Retry `n` (1-based) waits `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay before retry number `attempt` (1-based). Attempt 0 is the
    /// initial call and never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// `Some(delay)` while `retries_done` is still under budget.
    pub fn next_delay(&self, retries_done: u32) -> Option<Duration> {
        if retries_done >= self.max_retries {
            None
        } else {
            Some(self.delay_for_attempt(retries_done + 1))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(1_000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_attempt_has_no_delay() {
        let policy = RetryPolicy::new(2, Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn delay_grows_linearly() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn budget_stops_after_max_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(0), Some(Duration::from_millis(1_000)));
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(2_000)));
        assert_eq!(policy.next_delay(2), None);
    }

    #[test]
    fn zero_budget_never_retries() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.next_delay(0), None);
    }
}
