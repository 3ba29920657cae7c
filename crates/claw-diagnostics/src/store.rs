//! The bounded diagnostic log.
//!
//! This module provides:
//! - [`DiagnosticLog`]: Thread-safe ring buffer of [`LogEntry`] values with
//!   persistence and sink fan-out
//! - [`LogOptions`]: Per-call level, fault and context
//! - [`SharedDiagnosticLog`]: The `Arc` handle passed to call sites
//!
//! No method of [`DiagnosticLog`] returns an error or panics because of
//! storage or sink failures. Those are reported through `tracing` and the
//! in-memory collection stays authoritative.

use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::{DEFAULT_MAX_LOGS, DiagnosticsConfig};
use crate::environment::{Environment, EnvironmentInfo};
use crate::error::Result;
use crate::fault::Fault;
use crate::sinks::{ConsoleSink, LogSink, RemoteSink};
use crate::storage::{FileStorage, LogStorage, NullStorage};
use crate::types::{LogContext, LogEntry, LogLevel, LogQuery};

thread_local! {
    static IN_LOG: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as inside [`DiagnosticLog::log`] until dropped.
struct ReentryGuard;

impl ReentryGuard {
    fn enter() -> Option<Self> {
        if IN_LOG.with(Cell::get) {
            return None;
        }
        IN_LOG.with(|flag| flag.set(true));
        Some(Self)
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        IN_LOG.with(|flag| flag.set(false));
    }
}

/// Options for a single [`DiagnosticLog::log`] call.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Severity; defaults to `INFO`.
    pub level: Option<LogLevel>,
    /// The fault being reported.
    pub fault: Option<Fault>,
    /// Call-site context.
    pub context: Option<LogContext>,
}

impl LogOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level.
    #[must_use]
    pub const fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the fault.
    #[must_use]
    pub fn fault(mut self, fault: impl Into<Fault>) -> Self {
        self.fault = Some(fault.into());
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Bounded, persisted store of diagnostic entries.
pub struct DiagnosticLog {
    /// Maximum number of entries kept
    max_logs: usize,
    /// Entries in insertion order
    entries: Mutex<VecDeque<LogEntry>>,
    /// Persistence backend
    storage: Box<dyn LogStorage>,
    /// Delivery targets
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
    /// Build environment
    environment: Environment,
    /// Agent string and current location
    info: EnvironmentInfo,
}

impl std::fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLog")
            .field("max_logs", &self.max_logs)
            .field("len", &self.len())
            .field("storage", &self.storage.describe())
            .field("sinks", &self.sink_names())
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}

impl DiagnosticLog {
    /// Creates an in-memory log without sinks.
    #[must_use]
    pub fn new(max_logs: usize) -> Self {
        Self::with_storage(max_logs, NullStorage)
    }

    /// Creates a log backed by `storage`, seeded with what it holds.
    ///
    /// Unreadable or malformed persisted data yields an empty log and a
    /// warning.
    #[must_use]
    pub fn with_storage(max_logs: usize, storage: impl LogStorage + 'static) -> Self {
        let max_logs = max_logs.max(1);
        let storage: Box<dyn LogStorage> = Box::new(storage);

        let mut entries = match storage.load() {
            Ok(entries) => VecDeque::from(entries),
            Err(e) => {
                warn!(
                    error = %e,
                    storage = %storage.describe(),
                    "failed to load persisted diagnostics, starting empty"
                );
                VecDeque::new()
            }
        };
        while entries.len() > max_logs {
            entries.pop_front();
        }
        debug!(
            loaded = entries.len(),
            storage = %storage.describe(),
            "diagnostic log ready"
        );

        Self {
            max_logs,
            entries: Mutex::new(entries),
            storage,
            sinks: RwLock::new(Vec::new()),
            environment: Environment::from_build(),
            info: EnvironmentInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    /// Creates a log from configuration.
    ///
    /// Registers the console sink in development builds and the remote sink
    /// when an endpoint is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn open(config: &DiagnosticsConfig) -> Result<Self> {
        config.validate()?;

        let mut log = match &config.storage_path {
            Some(path) => Self::with_storage(config.max_logs, FileStorage::new(path)),
            None => Self::new(config.max_logs),
        };
        log.environment = config.environment;
        log.info = EnvironmentInfo::new(&config.app_name, env!("CARGO_PKG_VERSION"));

        if config.environment.is_development() {
            log.add_sink(Arc::new(ConsoleSink::new()));
        }
        if config.remote_endpoint.is_some() {
            log.add_sink(Arc::new(RemoteSink::new(config.remote_sink_config()?)));
        }
        Ok(log)
    }

    /// Registers a sink, returning the log for chaining.
    #[must_use]
    pub fn with_sink(self, sink: impl LogSink + 'static) -> Self {
        self.add_sink(Arc::new(sink));
        self
    }

    /// Sets the environment, returning the log for chaining.
    #[must_use]
    pub const fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Registers a sink.
    pub fn add_sink(&self, sink: Arc<dyn LogSink>) {
        self.sinks.write().push(sink);
    }

    /// Returns the names of the registered sinks.
    #[must_use]
    pub fn sink_names(&self) -> Vec<String> {
        self.sinks
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Records an entry.
    ///
    /// The entry is appended (evicting the oldest entry at capacity), the
    /// collection is persisted, and the entry is handed to every sink that
    /// accepts its level.
    ///
    /// A call made from inside another `log` call on the same thread (a sink
    /// that logs, a panic raised while persisting) returns the entry without
    /// storing it.
    pub fn log(&self, message: impl Into<String>, options: LogOptions) -> LogEntry {
        let level = options.level.unwrap_or(LogLevel::Info);

        let Some(_guard) = ReentryGuard::enter() else {
            let entry = LogEntry::create(
                Utc::now(),
                level,
                message.into(),
                options.fault,
                options.context,
                self.info.user_agent().to_string(),
                self.info.location(),
            );
            debug!(id = %entry.id, "nested diagnostic log call not stored");
            return entry;
        };

        let entry = {
            let mut entries = self.entries.lock();

            // Keep timestamps non-decreasing even if the wall clock steps back
            let now = Utc::now();
            let timestamp = entries.back().map_or(now, |last| last.timestamp.max(now));

            let entry = LogEntry::create(
                timestamp,
                level,
                message.into(),
                options.fault,
                options.context,
                self.info.user_agent().to_string(),
                self.info.location(),
            );

            while entries.len() >= self.max_logs {
                entries.pop_front();
            }
            entries.push_back(entry.clone());

            if let Err(e) = self.storage.save(entries.make_contiguous()) {
                warn!(
                    error = %e,
                    storage = %self.storage.describe(),
                    "failed to persist diagnostic log, keeping entries in memory"
                );
            }
            entry
        };

        self.dispatch(&entry);
        entry
    }

    /// Records a `DEBUG` entry.
    pub fn debug(
        &self,
        message: impl Into<String>,
        fault: Option<Fault>,
        context: Option<LogContext>,
    ) -> LogEntry {
        self.log_at(LogLevel::Debug, message, fault, context)
    }

    /// Records an `INFO` entry.
    pub fn info(
        &self,
        message: impl Into<String>,
        fault: Option<Fault>,
        context: Option<LogContext>,
    ) -> LogEntry {
        self.log_at(LogLevel::Info, message, fault, context)
    }

    /// Records a `WARNING` entry.
    pub fn warn(
        &self,
        message: impl Into<String>,
        fault: Option<Fault>,
        context: Option<LogContext>,
    ) -> LogEntry {
        self.log_at(LogLevel::Warning, message, fault, context)
    }

    /// Records an `ERROR` entry.
    pub fn error(
        &self,
        message: impl Into<String>,
        fault: Option<Fault>,
        context: Option<LogContext>,
    ) -> LogEntry {
        self.log_at(LogLevel::Error, message, fault, context)
    }

    /// Records a `CRITICAL` entry.
    pub fn critical(
        &self,
        message: impl Into<String>,
        fault: Option<Fault>,
        context: Option<LogContext>,
    ) -> LogEntry {
        self.log_at(LogLevel::Critical, message, fault, context)
    }

    fn log_at(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        fault: Option<Fault>,
        context: Option<LogContext>,
    ) -> LogEntry {
        self.log(
            message,
            LogOptions {
                level: Some(level),
                fault,
                context,
            },
        )
    }

    /// Returns entries in insertion order, optionally restricted to one
    /// level and to the most recent `limit` matches.
    #[must_use]
    pub fn get_logs(&self, query: &LogQuery) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let limit = query.limit.unwrap_or(usize::MAX);

        let mut selected: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|e| e.matches(query))
            .take(limit)
            .cloned()
            .collect();
        selected.reverse();
        selected
    }

    /// Returns every entry whose message or error type contains `query`,
    /// ignoring case, in insertion order.
    #[must_use]
    pub fn search_logs(&self, query: &str) -> Vec<LogEntry> {
        let needle = query.to_lowercase();
        self.entries
            .lock()
            .iter()
            .filter(|e| e.contains_text(&needle))
            .cloned()
            .collect()
    }

    /// Removes every entry and the persisted copy.
    pub fn clear_logs(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        if let Err(e) = self.storage.clear() {
            warn!(
                error = %e,
                storage = %self.storage.describe(),
                "failed to clear persisted diagnostics"
            );
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the ring-buffer capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_logs
    }

    /// Returns the build environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the agent string stamped on entries.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.info.user_agent()
    }

    /// Updates the location stamped on subsequent entries.
    pub fn set_location(&self, location: Option<String>) {
        self.info.set_location(location);
    }

    fn dispatch(&self, entry: &LogEntry) {
        let sinks: Vec<Arc<dyn LogSink>> = self.sinks.read().clone();

        for sink in sinks.iter().filter(|s| s.accepts(entry.level)) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(entry)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(sink = %sink.name(), id = %entry.id, error = %e, "sink delivery failed");
                }
                Err(_) => {
                    warn!(sink = %sink.name(), id = %entry.id, "sink panicked during delivery");
                }
            }
        }
    }
}

/// Shared diagnostic log handle.
pub type SharedDiagnosticLog = Arc<DiagnosticLog>;

/// Creates a new shared in-memory log.
#[must_use]
pub fn shared_log(max_logs: usize) -> SharedDiagnosticLog {
    Arc::new(DiagnosticLog::new(max_logs))
}
