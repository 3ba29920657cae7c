//! CLI configuration.
//!
//! ```toml
//! [diagnostics]
//! max_logs = 200
//! storage_path = "/var/lib/console/diagnostics.json"
//!
//! [retry.query]
//! max_attempts = 5
//! initial_delay_ms = 250
//!
//! [retry.mutation]
//! max_attempts = 1
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use claw_diagnostics::DiagnosticsConfig;
use claw_retry::RetryPolicy;

use crate::error::CliError;

/// Store location used when neither the config file nor `--store` names one.
pub const DEFAULT_STORE_PATH: &str = ".claw-diag/diagnostics.json";

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Diagnostic log settings.
    pub diagnostics: DiagnosticsConfig,
    /// Per-policy retry overrides.
    pub retry: RetrySettings,
}

/// Overrides for the named retry policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Overrides for the `query` policy.
    pub query: PolicyOverride,
    /// Overrides for the `mutation` policy.
    pub mutation: PolicyOverride,
}

/// Optional replacements for a policy's budget and delays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    /// Total attempts, including the first.
    pub max_attempts: Option<u32>,
    /// Delay after the first failure, in milliseconds.
    pub initial_delay_ms: Option<u64>,
    /// Delay cap, in milliseconds.
    pub max_delay_ms: Option<u64>,
}

impl PolicyOverride {
    /// Applies the overrides to `policy`.
    #[must_use]
    pub fn apply<E>(&self, policy: RetryPolicy<E>) -> RetryPolicy<E> {
        let mut backoff = *policy.backoff();
        if let Some(ms) = self.initial_delay_ms {
            backoff = backoff.with_initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            backoff = backoff.with_max_delay(Duration::from_millis(ms));
        }

        let policy = policy.with_backoff(backoff);
        match self.max_attempts {
            Some(max) => policy.with_max_attempts(max),
            None => policy,
        }
    }

    fn validate(&self, name: &str) -> Result<(), CliError> {
        if self.max_attempts == Some(0) {
            return Err(CliError::Config(format!(
                "retry.{name}.max_attempts must be at least 1"
            )));
        }
        if let (Some(initial), Some(max)) = (self.initial_delay_ms, self.max_delay_ms) {
            if initial > max {
                return Err(CliError::Config(format!(
                    "retry.{name}.initial_delay_ms exceeds max_delay_ms"
                )));
            }
        }
        Ok(())
    }
}

impl CliConfig {
    /// Loads the configuration file, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        self.diagnostics.validate()?;
        self.retry.query.validate("query")?;
        self.retry.mutation.validate("mutation")?;
        Ok(())
    }

    /// Resolves the store path: `store` wins over the file, then the default.
    #[must_use]
    pub fn with_store(mut self, store: Option<PathBuf>) -> Self {
        if let Some(path) = store {
            self.diagnostics.storage_path = Some(path);
        } else if self.diagnostics.storage_path.is_none() {
            self.diagnostics.storage_path = Some(PathBuf::from(DEFAULT_STORE_PATH));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claw_retry::Backoff;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = CliConfig::load(None).expect("defaults");
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.diagnostics.max_logs, 100);
    }

    #[test]
    fn parse_full_toml() {
        let config = CliConfig::from_toml(
            r#"
            [diagnostics]
            max_logs = 3
            environment = "production"

            [retry.query]
            max_attempts = 2
            initial_delay_ms = 10
            max_delay_ms = 20
            "#,
        )
        .expect("parse");

        assert_eq!(config.diagnostics.max_logs, 3);
        assert_eq!(config.retry.query.max_attempts, Some(2));
        assert_eq!(config.retry.mutation, PolicyOverride::default());
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = CliConfig::from_toml("[retry.mutation]\nmax_attempts = 0").expect_err("invalid");
        assert!(err.to_string().contains("retry.mutation.max_attempts"));
    }

    #[test]
    fn rejects_inverted_delays() {
        let err = CliConfig::from_toml("[retry.query]\ninitial_delay_ms = 50\nmax_delay_ms = 5")
            .expect_err("invalid");
        assert!(err.to_string().contains("initial_delay_ms"));
    }

    #[test]
    fn rejects_invalid_diagnostics_section() {
        let err = CliConfig::from_toml("[diagnostics]\nmax_logs = 0").expect_err("invalid");
        assert!(matches!(err, CliError::Diagnostics(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("claw-diag.toml");
        std::fs::write(&path, "[diagnostics]\nmax_logs = 9").expect("write");

        let config = CliConfig::load(Some(&path)).expect("load");
        assert_eq!(config.diagnostics.max_logs, 9);
    }

    #[test]
    fn load_missing_file_fails() {
        let err =
            CliConfig::load(Some(Path::new("/nonexistent/claw-diag.toml"))).expect_err("missing");
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn store_flag_wins() {
        let config = CliConfig::default()
            .with_store(Some(PathBuf::from("/tmp/override.json")));
        assert_eq!(
            config.diagnostics.storage_path,
            Some(PathBuf::from("/tmp/override.json"))
        );

        let config = CliConfig::default().with_store(None);
        assert_eq!(
            config.diagnostics.storage_path,
            Some(PathBuf::from(DEFAULT_STORE_PATH))
        );
    }

    #[test]
    fn override_applies_to_policy() {
        let overrides = PolicyOverride {
            max_attempts: Some(6),
            initial_delay_ms: Some(5),
            max_delay_ms: Some(40),
        };
        let policy = overrides.apply(RetryPolicy::<std::io::Error>::query());

        assert_eq!(policy.name(), "query");
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.backoff().initial_delay, Duration::from_millis(5));
        assert_eq!(policy.backoff().max_delay, Duration::from_millis(40));
    }

    #[test]
    fn empty_override_keeps_policy() {
        let policy = RetryPolicy::<std::io::Error>::new("p", 3, Backoff::none());
        let applied = PolicyOverride::default().apply(policy);
        assert_eq!(applied.max_attempts(), 3);
        assert_eq!(*applied.backoff(), Backoff::none());
    }
}
