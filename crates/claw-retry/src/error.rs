//! Error types for cancellable retries.

use thiserror::Error;

/// Why a cancellable retry loop stopped without a value.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed; carries the last error.
    #[error("gave up after {attempts} attempts: {error}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        error: E,
    },

    /// The policy refused to retry this error.
    #[error("non-retryable failure on attempt {attempts}: {error}")]
    Rejected {
        /// Attempts made.
        attempts: u32,
        /// The rejected error.
        #[source]
        error: E,
    },

    /// Cancelled before an attempt or during a delay.
    #[error("retry aborted after {attempts} attempts")]
    Aborted {
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Aborted { attempts } => *attempts,
        }
    }

    /// Returns true if the loop was cancelled.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Borrows the operation's last error, if there is one.
    #[must_use]
    pub const fn error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { error, .. } | Self::Rejected { error, .. } => Some(error),
            Self::Aborted { .. } => None,
        }
    }

    /// Takes the operation's last error, if there is one.
    #[must_use]
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Exhausted { error, .. } | Self::Rejected { error, .. } => Some(error),
            Self::Aborted { .. } => None,
        }
    }
}
