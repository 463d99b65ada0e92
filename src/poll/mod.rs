//! Retrying poller.
//!
//! Drives a [`PollStep`] until it reports done, fails permanently, exhausts
//! its [`RetryPolicy`], or is cancelled. The poller itself does no I/O beyond
//! sleeping; every side effect lives in the step.

mod cell;
mod error;
mod outcome;
mod policy;
mod step;


pub use cell::ObservationCell;
pub use error::*;
pub use outcome::{Diagnostic, PollOutcome, Step};
pub use policy::RetryPolicy;
pub use step::{poll_fn, PollFn, PollStep};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Repeats a step under a retry policy.
///
/// # Timeout boundary
///
/// Attempts start at or before the deadline, never after it. After a pending
/// attempt the poller sleeps one interval only if the next attempt would still
/// start within the timeout; otherwise it returns
/// [`PollOutcome::TimedOut`] straight away. With `N * interval <= timeout`
/// an N-th attempt is therefore always made.
///
/// # Cancellation
///
/// Cancelling the poller's token aborts a pending sleep immediately and
/// yields [`PollOutcome::Cancelled`]. No attempt starts after cancellation.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    cancel: CancellationToken,
}

impl Poller {
    /// A poller with its own, never-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run `step` until it resolves.
    ///
    /// The first attempt happens immediately. Errors returned by the step are
    /// propagated as-is, without a further attempt.
    pub async fn poll_until<S>(
        &self,
        step: &mut S,
        policy: &RetryPolicy,
    ) -> Result<PollOutcome<S::Output>, S::Error>
    where
        S: PollStep + ?Sized,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        let outcome = loop {
            if self.cancel.is_cancelled() {
                break PollOutcome::Cancelled { attempts };
            }

            attempts += 1;
            metrics::counter!("stratus_poll_attempts_total").increment(1);
            tracing::trace!(attempt = attempts, elapsed = ?start.elapsed(), "Polling");

            match step.step().await? {
                Step::Done(value) => break PollOutcome::Converged(value),
                Step::Failed(diagnostic) => break PollOutcome::PermanentFailure(diagnostic),
                Step::Pending => {}
            }

            let elapsed = start.elapsed();
            if !policy.allows_another(attempts, elapsed) {
                break PollOutcome::TimedOut { attempts, elapsed };
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    break PollOutcome::Cancelled { attempts };
                }
                _ = tokio::time::sleep(policy.interval()) => {}
            }
        };

        metrics::counter!("stratus_poll_outcomes_total", "outcome" => outcome.label())
            .increment(1);
        tracing::debug!(
            attempts = attempts,
            elapsed = ?start.elapsed(),
            outcome = outcome.label(),
            "Poll resolved"
        );

        Ok(outcome)
    }
}
