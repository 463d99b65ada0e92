//! The unit of work a poller repeats.

use super::outcome::Step;
use async_trait::async_trait;
use std::future::Future;

/// One refresh-and-check round-trip against a remote system.
///
/// `Ok(Step::Pending)` asks for another attempt. `Err` is a non-retryable
/// failure: the poller propagates it without attempting again.
#[async_trait]
pub trait PollStep: Send {
    type Output: Send;
    type Error: Send;

    async fn step(&mut self) -> Result<Step<Self::Output>, Self::Error>;
}

/// A [`PollStep`] built from an async closure. See [`poll_fn`].
pub struct PollFn<F> {
    f: F,
}

/// Adapt an async closure into a [`PollStep`].
///
/// ```
/// use std::time::Duration;
/// use stratus::poll::{poll_fn, PollOutcome, Poller, RetryPolicy, Step};
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::attempts(3, Duration::from_millis(1)).unwrap();
/// let mut step = poll_fn(|| async { Ok::<_, std::convert::Infallible>(Step::Done(42)) });
/// let outcome = Poller::new().poll_until(&mut step, &policy).await.unwrap();
/// assert_eq!(outcome, PollOutcome::Converged(42));
/// # });
/// ```
pub fn poll_fn<F>(f: F) -> PollFn<F> {
    PollFn { f }
}

#[async_trait]
impl<F, Fut, T, E> PollStep for PollFn<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Step<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn step(&mut self) -> Result<Step<T>, E> {
        (self.f)().await
    }
}
