//! Convergence engine.
//!
//! Specializes the [`Poller`] per resource kind. A classifier decides, from
//! the latest observation of a resource, whether the resource has reached its
//! target state, needs more time, or can never get there.

mod image;
mod node;
mod operation;

#[cfg(test)]
mod tests;

pub use image::ImageAvailable;
pub use node::NodeInState;
pub use operation::OperationDone;

use crate::poll::{Diagnostic, ObservationCell, PollOutcome, PollStep, Poller, RetryPolicy, Step};
use crate::provider::{AccessError, Operation, ResourceAccessor};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Verdict on one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Pending,
    Converged,
    Failed(Diagnostic),
}

/// How a classifier treats a resource the provider reports as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Absence {
    /// Not created yet, keep polling
    #[default]
    Pending,
    /// The resource was expected to exist
    Failed,
    /// Absence is the target state, e.g. a destroyed node
    Converged,
}

impl Absence {
    /// Classify a missing resource of the given kind.
    pub fn classify(self, kind: &str) -> Classification {
        match self {
            Absence::Pending => Classification::Pending,
            Absence::Converged => Classification::Converged,
            Absence::Failed => {
                Classification::Failed(Diagnostic::with_status(404, format!("{kind} not found")))
            }
        }
    }
}

/// Maps an observation of `R` onto a [`Classification`].
///
/// `None` means the provider reported the resource absent; every classifier
/// handles that case explicitly.
pub trait Classify<R>: Send + Sync {
    fn classify(&self, observed: Option<&R>) -> Classification;
}

/// Converges as soon as the resource exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Present;

impl<R> Classify<R> for Present {
    fn classify(&self, observed: Option<&R>) -> Classification {
        match observed {
            Some(_) => Classification::Converged,
            None => Classification::Pending,
        }
    }
}

/// One refresh of an [`ObservationCell`] followed by classification.
struct ConvergeStep<'a, R, A: ?Sized, C: ?Sized> {
    accessor: &'a A,
    id: &'a str,
    classifier: &'a C,
    cell: ObservationCell<R>,
}

#[async_trait]
impl<'a, R, A, C> PollStep for ConvergeStep<'a, R, A, C>
where
    R: Send + 'a,
    A: ResourceAccessor<R> + ?Sized,
    C: Classify<R> + ?Sized,
{
    type Output = Option<R>;
    type Error = AccessError;

    async fn step(&mut self) -> Result<Step<Option<R>>, AccessError> {
        let observed = self.cell.refresh(self.accessor, self.id).await?;
        match self.classifier.classify(observed) {
            Classification::Pending => Ok(Step::Pending),
            Classification::Converged => Ok(Step::Done(self.cell.take())),
            Classification::Failed(diagnostic) => Ok(Step::Failed(diagnostic)),
        }
    }
}

/// Polls resources until a classifier is satisfied.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceEngine {
    poller: Poller,
}

impl ConvergenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            poller: Poller::with_cancellation(cancel),
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Refresh `id` through `accessor` until `classifier` reports converged
    /// or failed, or `policy` runs out.
    ///
    /// The converged value is the final observed state; it is `None` only when
    /// the classifier accepts absence as convergence. Accessor errors are
    /// returned immediately.
    pub async fn converge_until<R, A, C>(
        &self,
        accessor: &A,
        id: &str,
        classifier: &C,
        policy: &RetryPolicy,
    ) -> Result<PollOutcome<Option<R>>, AccessError>
    where
        R: Send,
        A: ResourceAccessor<R> + ?Sized,
        C: Classify<R> + ?Sized,
    {
        let mut step = ConvergeStep {
            accessor,
            id,
            classifier,
            cell: ObservationCell::new(),
        };
        tracing::debug!(resource_id = %id, "Awaiting convergence");
        self.poller.poll_until(&mut step, policy).await
    }

    /// Wait for an operation to finish cleanly, then wait for the resource it
    /// targets to become visible.
    ///
    /// Each phase gets the whole of `policy`, so the wait can last up to twice
    /// its timeout. The target is looked up by the last segment of the
    /// operation's target link.
    pub async fn await_operation_then_fetch<R, O, A>(
        &self,
        operations: &O,
        operation_id: &str,
        resources: &A,
        policy: &RetryPolicy,
    ) -> Result<PollOutcome<R>, AccessError>
    where
        R: Send,
        O: ResourceAccessor<Operation> + ?Sized,
        A: ResourceAccessor<R> + ?Sized,
    {
        let outcome = self
            .converge_until(operations, operation_id, &OperationDone::new(), policy)
            .await?;
        let operation = match require_present(outcome, "operation", operation_id).into_converged()
        {
            Ok(operation) => operation,
            Err(unresolved) => return Ok(unresolved),
        };

        let Some(target) = operation.target_name() else {
            return Ok(PollOutcome::PermanentFailure(Diagnostic::new(format!(
                "operation {operation_id} has no target"
            ))));
        };
        tracing::debug!(operation_id = %operation_id, target = %target, "Operation done");

        let outcome = self
            .converge_until(resources, target, &Present, policy)
            .await?;
        Ok(require_present(outcome, "target", target))
    }
}

/// Treat a converged-but-absent observation as a permanent failure.
fn require_present<R>(outcome: PollOutcome<Option<R>>, kind: &str, id: &str) -> PollOutcome<R> {
    match outcome.into_converged() {
        Ok(Some(value)) => PollOutcome::Converged(value),
        Ok(None) => PollOutcome::PermanentFailure(Diagnostic::with_status(
            404,
            format!("{kind} {id} not found"),
        )),
        Err(unresolved) => unresolved,
    }
}
