//! Retry loop.
//!
//! [`RetryExecutor::run`] invokes an operation until it succeeds, the policy
//! refuses the error, or the attempt budget is spent. The observer hears about
//! every failure that will be retried, never about the final one.

use std::convert::Infallible;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RetryError;
use crate::policy::RetryPolicy;

/// Notified before each retry with the 1-based number of the attempt that
/// just failed and its error.
pub trait RetryObserver<E> {
    /// Called after a failed attempt that will be retried.
    fn on_retry(&self, attempt: u32, error: &E);
}

impl<E, F> RetryObserver<E> for F
where
    F: Fn(u32, &E),
{
    fn on_retry(&self, attempt: u32, error: &E) {
        self(attempt, error);
    }
}

/// Observer that ignores every retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<E> RetryObserver<E> for NoopObserver {
    fn on_retry(&self, _attempt: u32, _error: &E) {}
}

/// Result of a retry loop with bookkeeping.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// The value, or the error that ended the loop.
    pub result: Result<T, E>,
    /// Number of attempts made.
    pub attempts: u32,
    /// Time spent, including delays.
    pub elapsed: Duration,
}

/// Runs operations under a [`RetryPolicy`].
///
/// The executor holds no state; concurrent runs are independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor;

impl RetryExecutor {
    /// Creates an executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs `operation` until it succeeds or the policy gives up, returning
    /// the value or the last error.
    ///
    /// No timeout is applied to individual attempts. Wrap the operation in
    /// `tokio::time::timeout` if an attempt can hang.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt when it was not retryable or
    /// the attempt budget was spent.
    pub async fn run<T, E, F, Fut, O>(
        &self,
        policy: &RetryPolicy<E>,
        operation: F,
        observer: &O,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        O: RetryObserver<E> + ?Sized,
    {
        self.run_with_outcome(policy, operation, observer).await.result
    }

    /// Like [`run`](Self::run), also reporting attempts made and time spent.
    pub async fn run_with_outcome<T, E, F, Fut, O>(
        &self,
        policy: &RetryPolicy<E>,
        operation: F,
        observer: &O,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        O: RetryObserver<E> + ?Sized,
    {
        let start = Instant::now();
        let (result, attempts) = drive(policy, operation, observer, &Uninterrupted).await;

        let result = result.map_err(|exit| match exit {
            Exit::Exhausted(e) | Exit::Rejected(e) => e,
            Exit::Interrupted(never) => match never {},
        });

        RetryOutcome {
            result,
            attempts,
            elapsed: start.elapsed(),
        }
    }

    /// Like [`run`](Self::run), but stops when `cancel` fires.
    ///
    /// The token is checked before every attempt and raced against every
    /// delay. An attempt already in flight is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Aborted`] on cancellation, otherwise
    /// [`RetryError::Rejected`] or [`RetryError::Exhausted`] carrying the last
    /// error.
    pub async fn run_cancellable<T, E, F, Fut, O>(
        &self,
        policy: &RetryPolicy<E>,
        operation: F,
        observer: &O,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        O: RetryObserver<E> + ?Sized,
    {
        let (result, attempts) = drive(policy, operation, observer, &Cancellable(cancel)).await;

        result.map_err(|exit| match exit {
            Exit::Exhausted(error) => RetryError::Exhausted { attempts, error },
            Exit::Rejected(error) => RetryError::Rejected { attempts, error },
            Exit::Interrupted(()) => RetryError::Aborted { attempts },
        })
    }
}

enum Exit<E, S> {
    Exhausted(E),
    Rejected(E),
    Interrupted(S),
}

/// Source of interruptions for the retry loop.
trait Interrupt {
    type Signal;

    /// Returns a signal if the loop must stop before the next attempt.
    fn check(&self) -> Option<Self::Signal>;

    /// Waits for `delay`, returning early with a signal on interruption.
    fn sleep(&self, delay: Duration) -> impl Future<Output = Option<Self::Signal>> + Send + '_;
}

struct Uninterrupted;

impl Interrupt for Uninterrupted {
    type Signal = Infallible;

    fn check(&self) -> Option<Infallible> {
        None
    }

    fn sleep(&self, delay: Duration) -> impl Future<Output = Option<Infallible>> + Send + '_ {
        async move {
            sleep(delay).await;
            None
        }
    }
}

struct Cancellable<'a>(&'a CancellationToken);

impl Interrupt for Cancellable<'_> {
    type Signal = ();

    fn check(&self) -> Option<()> {
        self.0.is_cancelled().then_some(())
    }

    fn sleep(&self, delay: Duration) -> impl Future<Output = Option<()>> + Send + '_ {
        async move {
            tokio::select! {
                () = self.0.cancelled() => Some(()),
                () = sleep(delay) => None,
            }
        }
    }
}

async fn drive<T, E, F, Fut, O, I>(
    policy: &RetryPolicy<E>,
    mut operation: F,
    observer: &O,
    interrupt: &I,
) -> (Result<T, Exit<E, I::Signal>>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    O: RetryObserver<E> + ?Sized,
    I: Interrupt,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1u32;

    loop {
        if let Some(signal) = interrupt.check() {
            debug!(policy = %policy.name(), attempt, "retry loop cancelled before attempt");
            return (Err(Exit::Interrupted(signal)), attempt - 1);
        }

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        policy = %policy.name(),
                        attempts = attempt,
                        "operation succeeded after retries"
                    );
                }
                return (Ok(value), attempt);
            }
            Err(e) => e,
        };

        if !policy.is_retryable(&error) {
            debug!(
                policy = %policy.name(),
                attempt,
                error = %error,
                "operation failed with non-retryable error"
            );
            return (Err(Exit::Rejected(error)), attempt);
        }

        if attempt >= max_attempts {
            warn!(
                policy = %policy.name(),
                attempts = attempt,
                error = %error,
                "operation failed after all retry attempts"
            );
            return (Err(Exit::Exhausted(error)), attempt);
        }

        notify(observer, attempt, &error, policy.name());

        let delay = policy.delay_for(attempt);
        debug!(
            policy = %policy.name(),
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "retrying operation after failure"
        );

        if let Some(signal) = interrupt.sleep(delay).await {
            debug!(policy = %policy.name(), attempt, "retry loop cancelled during delay");
            return (Err(Exit::Interrupted(signal)), attempt);
        }
        attempt += 1;
    }
}

fn notify<E, O>(observer: &O, attempt: u32, error: &E, policy: &str)
where
    O: RetryObserver<E> + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.on_retry(attempt, error)));
    if outcome.is_err() {
        warn!(policy = %policy, attempt, "retry observer panicked");
    }
}
