//! Polling and convergence timeout configuration

use crate::poll::{PolicyError, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default policy for ad-hoc polls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_ms: 60_000,
        }
    }
}

impl PollingConfig {
    pub fn retry_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::new(
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.timeout_ms),
        )
    }
}

/// Budgets for node and image state transitions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub node_running_ms: u64,
    pub node_terminated_ms: u64,
    pub node_suspended_ms: u64,
    pub image_available_ms: u64,
    /// Interval between status checks for all of the above
    pub poll_interval_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            node_running_ms: 1_200_000,
            node_terminated_ms: 30_000,
            node_suspended_ms: 30_000,
            image_available_ms: 3_600_000,
            poll_interval_ms: 1000,
        }
    }
}

impl TimeoutsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn node_running(&self) -> Result<RetryPolicy, PolicyError> {
        self.policy(self.node_running_ms)
    }

    pub fn node_terminated(&self) -> Result<RetryPolicy, PolicyError> {
        self.policy(self.node_terminated_ms)
    }

    pub fn node_suspended(&self) -> Result<RetryPolicy, PolicyError> {
        self.policy(self.node_suspended_ms)
    }

    pub fn image_available(&self) -> Result<RetryPolicy, PolicyError> {
        self.policy(self.image_available_ms)
    }

    fn policy(&self, timeout_ms: u64) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::new(self.poll_interval(), Duration::from_millis(timeout_ms))
    }
}
