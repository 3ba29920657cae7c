//! Process-wide routing of unhandled faults into the diagnostic log.
//!
//! This module provides:
//! - [`GlobalFaultTap`]: Installs one panic hook per process and observes
//!   detached tasks whose failures nobody awaits
//! - [`DiagnosticLayer`]: A `tracing` layer that records `ERROR` events as
//!   `WARNING` entries (development builds)
//!
//! There is no uninstall path. The hook lives as long as the process.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, debug};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::DiagnosticsConfig;
use crate::fault::Fault;
use crate::store::SharedDiagnosticLog;
use crate::types::{LogContext, LogEntry};

static INSTALLED: OnceLock<SharedDiagnosticLog> = OnceLock::new();

/// Entry point for process-wide fault capture.
#[derive(Debug, Clone, Copy)]
pub struct GlobalFaultTap;

impl GlobalFaultTap {
    /// Installs the panic hook, forwarding panics to `log`.
    ///
    /// The previous hook still runs afterwards, so the usual panic output is
    /// preserved. Returns `false` if a tap is already installed in this
    /// process, in which case nothing changes.
    pub fn install(log: SharedDiagnosticLog) -> bool {
        if INSTALLED.set(Arc::clone(&log)).is_err() {
            return false;
        }

        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            record_panic(&log, info);
            previous(info);
        }));
        debug!("global fault tap installed");
        true
    }

    /// Returns the log the tap forwards to, if installed.
    #[must_use]
    pub fn installed() -> Option<SharedDiagnosticLog> {
        INSTALLED.get().cloned()
    }

    /// Records a failure that escaped an asynchronous task.
    pub fn report_rejection<E>(log: &SharedDiagnosticLog, task: &str, error: &E) -> LogEntry
    where
        E: Error + 'static,
    {
        log.error(
            format!("unhandled task failure in '{task}': {error}"),
            Some(Fault::from_error(error)),
            Some(
                LogContext::new()
                    .with("source", "unhandled_rejection")
                    .with("task", task),
            ),
        )
    }

    /// Spawns a detached task whose `Err` result or panic is recorded.
    ///
    /// Panics are recorded only when they would not already be captured by
    /// the hook installed into the same log.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn_observed<F, T, E>(
        log: SharedDiagnosticLog,
        task: impl Into<String>,
        future: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Error + Send + Sync + 'static,
    {
        let task = task.into();
        let inner = tokio::spawn(future);

        tokio::spawn(async move {
            match inner.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    Self::report_rejection(&log, &task, &e);
                }
                Err(join_err) if join_err.is_panic() => {
                    let hooked = INSTALLED.get().is_some_and(|l| Arc::ptr_eq(l, &log));
                    if !hooked {
                        log.error(
                            format!("task '{task}' panicked"),
                            Some(Fault::from_error(&join_err)),
                            Some(
                                LogContext::new()
                                    .with("source", "task_panic")
                                    .with("task", task.as_str()),
                            ),
                        );
                    }
                }
                Err(_) => {
                    debug!(task = %task, "observed task cancelled");
                }
            }
        })
    }
}

fn record_panic(log: &SharedDiagnosticLog, info: &PanicHookInfo<'_>) {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>").to_string();

    let mut context = LogContext::new()
        .with("source", "panic")
        .with("thread", thread_name.as_str());
    if let Some(location) = info.location() {
        context.insert("file", location.file());
        context.insert("line", location.line());
        context.insert("column", location.column());
    }

    let backtrace = Backtrace::capture();
    let fault = Fault {
        error_type: "Panic".to_string(),
        message: payload.clone(),
        stack: None,
    };
    let fault = match backtrace.status() {
        BacktraceStatus::Captured => fault.with_stack(backtrace.to_string()),
        _ => match info.location() {
            Some(location) => fault.with_stack(format!("at {location}")),
            None => fault,
        },
    };

    log.error(
        format!("thread '{thread_name}' panicked: {payload}"),
        Some(fault),
        Some(context),
    );
}

/// Tracing layer mirroring `ERROR` events into the diagnostic log at
/// `WARNING` level.
///
/// Events emitted by this crate are skipped. The event continues to every
/// other layer unchanged.
#[derive(Clone)]
pub struct DiagnosticLayer {
    log: SharedDiagnosticLog,
}

impl fmt::Debug for DiagnosticLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticLayer").finish_non_exhaustive()
    }
}

impl DiagnosticLayer {
    /// Creates a layer recording into `log`.
    #[must_use]
    pub const fn new(log: SharedDiagnosticLog) -> Self {
        Self { log }
    }

    /// Creates the layer only when `config` enables mirroring in a
    /// development build.
    #[must_use]
    pub fn for_config(log: SharedDiagnosticLog, config: &DiagnosticsConfig) -> Option<Self> {
        config.mirrors_tracing().then(|| Self::new(log))
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR || metadata.target().starts_with("claw_diagnostics") {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut context = visitor.context;
        context.insert("source", "tracing");
        context.insert("target", metadata.target());

        self.log.warn(visitor.message, None, Some(context));
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    context: LogContext,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.context.insert(field.name(), value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.context.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.context.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.context.insert(field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.context.insert(field.name(), format!("{value:?}"));
        }
    }
}
