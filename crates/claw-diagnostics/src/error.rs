//! Error types for the diagnostics layer.
//!
//! These errors never escape the public logging surface of
//! [`DiagnosticLog`](crate::DiagnosticLog); they are produced by storage
//! backends, sinks and configuration loading, and the store downgrades them
//! to `tracing` warnings.

use thiserror::Error;

/// Errors that can occur in the diagnostics layer.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data exists but could not be interpreted.
    #[error("corrupt log storage: {0}")]
    Corrupt(String),

    /// Storage rejected a write (simulated quota, read-only media, ...).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A sink failed to deliver an entry.
    #[error("sink '{sink}' failed: {reason}")]
    Sink {
        /// Name of the failing sink.
        sink: String,
        /// Failure description.
        reason: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiagnosticError {
    /// Creates a sink failure.
    #[must_use]
    pub fn sink(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for diagnostics operations.
pub type Result<T> = std::result::Result<T, DiagnosticError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = DiagnosticError::Corrupt("expected array".to_string());
        assert_eq!(err.to_string(), "corrupt log storage: expected array");

        let err = DiagnosticError::StorageUnavailable("quota exceeded".to_string());
        assert_eq!(err.to_string(), "storage unavailable: quota exceeded");

        let err = DiagnosticError::sink("remote", "connection refused");
        assert_eq!(err.to_string(), "sink 'remote' failed: connection refused");

        let err = DiagnosticError::Config("max_logs must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: max_logs must be at least 1"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DiagnosticError>();
    }

    #[test]
    fn error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: DiagnosticError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_serialization_conversion() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").expect_err("invalid json");
        let err: DiagnosticError = json_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
