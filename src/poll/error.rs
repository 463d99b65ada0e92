//! Error types for polling and convergence.

use super::outcome::Diagnostic;
use crate::provider::AccessError;
use std::time::Duration;
use thiserror::Error;

/// Invalid retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("polling interval must be positive")]
    ZeroInterval,

    #[error("timeout {timeout:?} is shorter than the polling interval {interval:?}")]
    TimeoutShorterThanInterval { timeout: Duration, interval: Duration },

    #[error("max attempts must be at least 1")]
    ZeroAttempts,

    #[error("policy needs a timeout or a max attempt count")]
    Unbounded,
}

/// A poll that did not converge, surfaced as an error to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvergenceError {
    /// Budget exhausted before the resource converged
    #[error("timed out after {attempts} attempts ({elapsed:?})")]
    TimedOut { attempts: u32, elapsed: Duration },

    /// The resource reached a state it will never leave
    #[error("permanent failure: {0}")]
    Failed(Diagnostic),

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// A provider call failed with a non-retryable error
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl ConvergenceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConvergenceError::TimedOut { .. })
    }
}
