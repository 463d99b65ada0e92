//! Poll results.

use super::error::ConvergenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a resource will never converge: the provider's status and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub status: Option<u16>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of one refresh-and-check round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Condition satisfied
    Done(T),
    /// Not yet; try again after the interval
    Pending,
    /// Condition can never be satisfied
    Failed(Diagnostic),
}

/// Outcome of a bounded poll. Exactly one per poll operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The final observed state
    Converged(T),
    /// Time or attempt budget exhausted
    TimedOut { attempts: u32, elapsed: Duration },
    PermanentFailure(Diagnostic),
    /// The poller's cancellation token fired
    Cancelled { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged(_))
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Converged(_) => "converged",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::PermanentFailure(_) => "failed",
            PollOutcome::Cancelled { .. } => "cancelled",
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollOutcome<U> {
        match self {
            PollOutcome::Converged(v) => PollOutcome::Converged(f(v)),
            PollOutcome::TimedOut { attempts, elapsed } => {
                PollOutcome::TimedOut { attempts, elapsed }
            }
            PollOutcome::PermanentFailure(d) => PollOutcome::PermanentFailure(d),
            PollOutcome::Cancelled { attempts } => PollOutcome::Cancelled { attempts },
        }
    }

    /// Split off the converged value. Any other outcome is handed back
    /// unchanged, retyped for the caller's own result.
    pub fn into_converged<U>(self) -> Result<T, PollOutcome<U>> {
        match self {
            PollOutcome::Converged(v) => Ok(v),
            PollOutcome::TimedOut { attempts, elapsed } => {
                Err(PollOutcome::TimedOut { attempts, elapsed })
            }
            PollOutcome::PermanentFailure(d) => Err(PollOutcome::PermanentFailure(d)),
            PollOutcome::Cancelled { attempts } => Err(PollOutcome::Cancelled { attempts }),
        }
    }

    /// Everything but convergence becomes a [`ConvergenceError`].
    pub fn into_result(self) -> Result<T, ConvergenceError> {
        match self {
            PollOutcome::Converged(v) => Ok(v),
            PollOutcome::TimedOut { attempts, elapsed } => {
                Err(ConvergenceError::TimedOut { attempts, elapsed })
            }
            PollOutcome::PermanentFailure(d) => Err(ConvergenceError::Failed(d)),
            PollOutcome::Cancelled { attempts } => Err(ConvergenceError::Cancelled { attempts }),
        }
    }
}
