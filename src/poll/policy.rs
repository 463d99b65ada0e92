//! Retry budgets.

use super::error::PolicyError;
use std::time::Duration;

/// Immutable polling budget.
///
/// A policy always has a positive `interval` and at least one of a wall-clock
/// `timeout` or a `max_attempts` count. When both are set, whichever runs out
/// first ends the poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
    timeout: Option<Duration>,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Time-budgeted policy.
    ///
    /// ```
    /// use std::time::Duration;
    /// use stratus::poll::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(10)).unwrap();
    /// assert_eq!(policy.timeout(), Some(Duration::from_secs(10)));
    /// assert!(RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(1)).is_err());
    /// ```
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, PolicyError> {
        Self::validated(interval, Some(timeout), None)
    }

    /// Attempt-bounded policy, as used by the reaper.
    pub fn attempts(max_attempts: u32, interval: Duration) -> Result<Self, PolicyError> {
        Self::validated(interval, None, Some(max_attempts))
    }

    /// Add an attempt cap to a time-budgeted policy.
    pub fn with_max_attempts(self, max_attempts: u32) -> Result<Self, PolicyError> {
        Self::validated(self.interval, self.timeout, Some(max_attempts))
    }

    fn validated(
        interval: Duration,
        timeout: Option<Duration>,
        max_attempts: Option<u32>,
    ) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        if let Some(timeout) = timeout {
            if timeout < interval {
                return Err(PolicyError::TimeoutShorterThanInterval { timeout, interval });
            }
        }
        match max_attempts {
            Some(0) => return Err(PolicyError::ZeroAttempts),
            None if timeout.is_none() => return Err(PolicyError::Unbounded),
            _ => {}
        }
        Ok(Self {
            interval,
            timeout,
            max_attempts,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Whether another attempt may follow `attempts` pending ones after `elapsed`.
    ///
    /// The next attempt would start one `interval` from now; it is allowed
    /// only if that start is at or before the deadline.
    pub fn allows_another(&self, attempts: u32, elapsed: Duration) -> bool {
        if let Some(max) = self.max_attempts {
            if attempts >= max {
                return false;
            }
        }
        match self.timeout {
            Some(timeout) => elapsed.saturating_add(self.interval) <= timeout,
            None => true,
        }
    }
}
