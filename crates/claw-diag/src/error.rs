//! CLI error types.

use thiserror::Error;

use claw_diagnostics::DiagnosticError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Diagnostic store failure.
    #[error("diagnostics error: {0}")]
    Diagnostics(#[from] DiagnosticError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Probe gave up.
    #[error("probe failed: {0}")]
    Probe(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_probe() {
        let err = CliError::Probe("HTTP 503 after 4 attempts".into());
        assert_eq!(err.to_string(), "probe failed: HTTP 503 after 4 attempts");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }

    #[test]
    fn cli_error_from_diagnostics_error() {
        let err = CliError::from(DiagnosticError::Config("max_logs must be at least 1".into()));
        assert!(err.to_string().starts_with("diagnostics error:"));
    }
}
