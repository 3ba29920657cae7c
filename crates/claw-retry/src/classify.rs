//! Transient vs. permanent failure classification.

use std::collections::BTreeSet;
use std::io;

/// Whether a failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// May succeed if retried (timeouts, overload, dropped connections).
    Transient,
    /// Retrying will not help (bad request, missing resource).
    Permanent,
}

impl ErrorClass {
    /// Returns true for [`ErrorClass::Transient`].
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Errors that know whether they are transient.
pub trait Classify {
    /// Classifies this error.
    fn classify(&self) -> ErrorClass;

    /// Shorthand for `self.classify().is_transient()`.
    fn is_transient(&self) -> bool {
        self.classify().is_transient()
    }
}

impl Classify for ErrorClass {
    fn classify(&self) -> ErrorClass {
        *self
    }
}

impl Classify for io::Error {
    fn classify(&self) -> ErrorClass {
        use io::ErrorKind;

        match self.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::UnexpectedEof => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }
}

/// Classifies an HTTP status code.
///
/// Server errors (5xx), 408 Request Timeout and 429 Too Many Requests are
/// transient. Everything else is permanent.
#[must_use]
pub const fn classify_status(status: u16) -> ErrorClass {
    match status {
        408 | 429 | 500..=599 => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}

/// Status classifier with extra transient codes on top of [`classify_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusClassifier {
    transient: BTreeSet<u16>,
}

impl StatusClassifier {
    /// Creates a classifier equivalent to [`classify_status`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats `status` as transient as well.
    #[must_use]
    pub fn allow(mut self, status: u16) -> Self {
        self.transient.insert(status);
        self
    }

    /// Classifies `status`.
    #[must_use]
    pub fn classify(&self, status: u16) -> ErrorClass {
        if self.transient.contains(&status) {
            ErrorClass::Transient
        } else {
            classify_status(status)
        }
    }
}
