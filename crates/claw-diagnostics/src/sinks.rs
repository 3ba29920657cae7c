//! Delivery sinks for diagnostic entries.
//!
//! This module provides the [`LogSink`] trait and implementations:
//! - [`ConsoleSink`]: Mirrors entries onto `tracing` (development console)
//! - [`RemoteSink`]: Fire-and-forget POST of one JSON record per entry
//! - [`MemorySink`]: Collects delivered entries in process
//!
//! Sinks are invoked after the entry has been stored and persisted. A sink
//! failure is reported through `tracing` only and never re-enters the store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::environment::Environment;
use crate::error::{DiagnosticError, Result};
use crate::types::{LogEntry, LogLevel};

/// Tracing target used by the console sink.
///
/// Events under this target are never captured back into the store.
pub const CONSOLE_TARGET: &str = "claw_diagnostics::console";

/// Trait for entry delivery targets.
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Returns the name of this sink.
    fn name(&self) -> &str;

    /// Returns true if entries at `level` should be delivered here.
    fn accepts(&self, _level: LogLevel) -> bool {
        true
    }

    /// Delivers one entry.
    ///
    /// Implementations must not block on I/O; slow work belongs on a
    /// background task.
    fn deliver(&self, entry: &LogEntry) -> Result<()>;
}

/// Console sink backed by `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Creates a new console sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn deliver(&self, entry: &LogEntry) -> Result<()> {
        let id = entry.id.as_str();
        let error_type = entry.error_type.as_str();
        let context = entry
            .context
            .as_ref()
            .and_then(|c| serde_json::to_string(c).ok())
            .unwrap_or_default();

        match entry.level {
            LogLevel::Debug => {
                debug!(target: CONSOLE_TARGET, id, error_type, %context, "{}", entry.message);
            }
            LogLevel::Info => {
                info!(target: CONSOLE_TARGET, id, error_type, %context, "{}", entry.message);
            }
            LogLevel::Warning => {
                warn!(target: CONSOLE_TARGET, id, error_type, %context, "{}", entry.message);
            }
            LogLevel::Error | LogLevel::Critical => {
                error!(
                    target: CONSOLE_TARGET,
                    id,
                    error_type,
                    level = %entry.level,
                    %context,
                    stack = entry.stack.as_deref().unwrap_or(""),
                    "{}",
                    entry.message
                );
            }
        }
        Ok(())
    }
}

/// The wire record sent to a remote collector.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord<'a> {
    /// The entry being reported
    #[serde(flatten)]
    pub entry: &'a LogEntry,
    /// Build environment of the reporting process
    pub environment: Environment,
}

/// Configuration for a remote sink.
#[derive(Debug, Clone)]
pub struct RemoteSinkConfig {
    /// Collector endpoint; `None` makes the sink a no-op.
    pub endpoint: Option<Url>,
    /// Minimum level forwarded to the collector.
    pub min_level: LogLevel,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Environment reported with each record.
    pub environment: Environment,
}

impl Default for RemoteSinkConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            min_level: LogLevel::Error,
            timeout: Duration::from_secs(5),
            environment: Environment::from_build(),
        }
    }
}

impl RemoteSinkConfig {
    /// Creates a config posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::Config` if the endpoint is not an http(s) URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| DiagnosticError::Config(format!("invalid remote endpoint: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DiagnosticError::Config(format!(
                "remote endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(Self {
            endpoint: Some(url),
            ..Self::default()
        })
    }

    /// Sets the environment reported with each record.
    #[must_use]
    pub const fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// Remote collector sink.
///
/// Each accepted entry becomes one POST carrying a [`RemoteRecord`], sent on
/// a detached tokio task. Without an endpoint delivery is skipped; outside a
/// tokio runtime it fails with [`DiagnosticError::Sink`].
#[derive(Debug, Clone)]
pub struct RemoteSink {
    config: RemoteSinkConfig,
    client: reqwest::Client,
}

impl RemoteSink {
    /// Creates a remote sink.
    #[must_use]
    pub fn new(config: RemoteSinkConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// A sink with no endpoint.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(RemoteSinkConfig::default())
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Url> {
        self.config.endpoint.as_ref()
    }

    /// Serializes the wire record for an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self, entry: &LogEntry) -> Result<Vec<u8>> {
        let record = RemoteRecord {
            entry,
            environment: self.config.environment,
        };
        Ok(serde_json::to_vec(&record)?)
    }
}

impl LogSink for RemoteSink {
    fn name(&self) -> &str {
        "remote"
    }

    fn accepts(&self, level: LogLevel) -> bool {
        level.is_at_least(self.config.min_level)
    }

    fn deliver(&self, entry: &LogEntry) -> Result<()> {
        let Some(endpoint) = self.config.endpoint.clone() else {
            return Ok(());
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Err(DiagnosticError::sink(
                self.name(),
                "no async runtime for remote delivery",
            ));
        };

        let body = self.encode(entry)?;
        let client = self.client.clone();
        let id = entry.id.clone();

        handle.spawn(async move {
            let response = client
                .post(endpoint.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    debug!(%id, "remote delivery accepted");
                }
                Ok(resp) => {
                    debug!(
                        %id,
                        status = %resp.status(),
                        endpoint = %endpoint,
                        "remote delivery rejected"
                    );
                }
                Err(e) => {
                    debug!(%id, error = %e, endpoint = %endpoint, "remote delivery failed");
                }
            }
        });

        Ok(())
    }
}

/// Sink that keeps delivered entries in memory.
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    min_level: LogLevel,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemorySink {
    /// Creates a sink accepting every level.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_level: LogLevel::Debug,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Only accepts entries at or above `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Returns the delivered entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Returns the number of delivered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, level: LogLevel) -> bool {
        level.is_at_least(self.min_level)
    }

    fn deliver(&self, entry: &LogEntry) -> Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}
