//! Named retry policies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::classify::Classify;

/// Decides whether an error may be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Attempt budget, delay rule and retry predicate for one kind of operation.
///
/// Policies are cheap to clone and can be shared between concurrent runs.
pub struct RetryPolicy<E> {
    name: String,
    max_attempts: u32,
    backoff: Backoff,
    predicate: Option<RetryPredicate<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            predicate: self.predicate.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    /// Creates a policy that retries every error.
    ///
    /// `max_attempts` counts the first call; values below 1 are raised to 1.
    #[must_use]
    pub fn new(name: impl Into<String>, max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            name: name.into(),
            max_attempts: max_attempts.max(1),
            backoff,
            predicate: None,
        }
    }

    /// Policy for idempotent reads: 4 attempts, 1s doubling up to 30s, 10% jitter.
    #[must_use]
    pub fn query() -> Self {
        Self::new(
            "query",
            4,
            Backoff::exponential(Duration::from_secs(1), 2.0, Duration::from_secs(30))
                .with_jitter(0.1),
        )
    }

    /// Policy for writes, retried only where `predicate` allows:
    /// 2 attempts, 500ms doubling up to 5s, 10% jitter.
    #[must_use]
    pub fn mutation_with<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::new(
            "mutation",
            2,
            Backoff::exponential(Duration::from_millis(500), 2.0, Duration::from_secs(5))
                .with_jitter(0.1),
        )
        .retry_if(predicate)
    }

    /// Retries only errors accepted by `predicate`.
    #[must_use]
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the attempt budget (at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replaces the delay rule.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Policy name, used in tracing output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The delay rule.
    #[must_use]
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Whether `error` may be retried. Without a predicate, every error may.
    #[must_use]
    pub fn is_retryable(&self, error: &E) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(error))
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay_for(attempt)
    }
}

impl<E: Classify + 'static> RetryPolicy<E> {
    /// Policy for writes that retries transient errors only.
    #[must_use]
    pub fn mutation() -> Self {
        Self::mutation_with(E::is_transient)
    }

    /// Restricts retries to errors classified as transient.
    #[must_use]
    pub fn transient_only(self) -> Self {
        self.retry_if(E::is_transient)
    }
}
