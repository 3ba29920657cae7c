//! Diagnostics configuration.
//!
//! Loaded from TOML, validated before use:
//!
//! ```toml
//! max_logs = 100
//! storage_path = "/var/lib/console/diagnostics.json"
//! environment = "production"
//! remote_endpoint = "https://collector.example.com/logs"
//! mirror_tracing_errors = false
//! app_name = "console"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{DiagnosticError, Result};
use crate::sinks::RemoteSinkConfig;

/// Default ring-buffer capacity.
pub const DEFAULT_MAX_LOGS: usize = 100;

/// Configuration for a [`DiagnosticLog`](crate::DiagnosticLog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Maximum number of entries kept; older entries are evicted first.
    pub max_logs: usize,
    /// File holding the persisted collection; `None` keeps logs in memory.
    pub storage_path: Option<PathBuf>,
    /// Build environment; development enables the console sink.
    pub environment: Environment,
    /// Collector endpoint for `ERROR`/`CRITICAL` entries.
    pub remote_endpoint: Option<String>,
    /// Capture `ERROR` tracing events as `WARNING` entries (development only).
    pub mirror_tracing_errors: bool,
    /// Application name used in the agent string.
    pub app_name: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_logs: DEFAULT_MAX_LOGS,
            storage_path: None,
            environment: Environment::from_build(),
            remote_endpoint: None,
            mirror_tracing_errors: true,
            app_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

impl DiagnosticsConfig {
    /// Creates a default configuration persisting to `path`.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Sets the ring-buffer capacity.
    #[must_use]
    pub const fn with_max_logs(mut self, max_logs: usize) -> Self {
        self.max_logs = max_logs;
        self
    }

    /// Sets the environment.
    #[must_use]
    pub const fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DiagnosticError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_logs == 0 {
            return Err(DiagnosticError::Config(
                "max_logs must be at least 1".to_string(),
            ));
        }

        if self.app_name.trim().is_empty() {
            return Err(DiagnosticError::Config(
                "app_name cannot be empty".to_string(),
            ));
        }

        if let Some(path) = &self.storage_path {
            if path.as_os_str().is_empty() {
                return Err(DiagnosticError::Config(
                    "storage_path cannot be empty".to_string(),
                ));
            }
        }

        if let Some(endpoint) = &self.remote_endpoint {
            RemoteSinkConfig::new(endpoint)?;
        }

        Ok(())
    }

    /// Remote sink configuration derived from this config.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid.
    pub fn remote_sink_config(&self) -> Result<RemoteSinkConfig> {
        let config = match &self.remote_endpoint {
            Some(endpoint) => RemoteSinkConfig::new(endpoint)?,
            None => RemoteSinkConfig::default(),
        };
        Ok(config.with_environment(self.environment))
    }

    /// Whether tracing `ERROR` events should be captured into the store.
    #[must_use]
    pub const fn mirrors_tracing(&self) -> bool {
        self.mirror_tracing_errors && self.environment.is_development()
    }
}
