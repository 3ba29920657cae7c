//! # claw-diagnostics
//!
//! Bounded, persisted diagnostic log for applications and tools.
//!
//! This crate provides:
//!
//! - [`DiagnosticLog`]: Ring buffer of [`LogEntry`] values, persisted after
//!   every change and fanned out to sinks
//! - [`LogLevel`], [`LogContext`], [`LogQuery`]: Entry metadata and queries
//! - [`Fault`]: Classification of the error behind a log call
//! - [`LogStorage`]: Persistence backends ([`FileStorage`], [`MemoryStorage`])
//! - [`LogSink`]: Delivery targets ([`ConsoleSink`], [`RemoteSink`])
//! - [`GlobalFaultTap`]: Routes panics and failed detached tasks into a log
//! - [`DiagnosticLayer`]: Mirrors `tracing` errors into a log
//!
//! ## Example
//!
//! ```rust
//! use claw_diagnostics::{DiagnosticLog, Fault, LogContext, LogLevel, LogQuery};
//!
//! let log = DiagnosticLog::new(100);
//! log.info("cache warmed", None, None);
//! log.error(
//!     "refresh failed",
//!     Some(Fault::http(503, "Service Unavailable")),
//!     Some(LogContext::new().with("attempt", 2)),
//! );
//!
//! let errors = log.get_logs(&LogQuery::new().with_level(LogLevel::Error));
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].error_type, "HTTP 503");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod environment;
pub mod error;
pub mod fault;
pub mod fault_tap;
pub mod sinks;
pub mod storage;
pub mod store;
pub mod types;

// Re-export main types
pub use config::{DEFAULT_MAX_LOGS, DiagnosticsConfig};
pub use environment::{Environment, EnvironmentInfo};
pub use error::{DiagnosticError, Result};
pub use fault::Fault;
pub use fault_tap::{DiagnosticLayer, GlobalFaultTap};
pub use sinks::{
    CONSOLE_TARGET, ConsoleSink, LogSink, MemorySink, RemoteRecord, RemoteSink, RemoteSinkConfig,
};
pub use storage::{FileStorage, LogStorage, MemoryStorage, NullStorage};
pub use store::{DiagnosticLog, LogOptions, SharedDiagnosticLog, shared_log};
pub use types::{EntryId, LogContext, LogEntry, LogLevel, LogQuery, ParseLevelError};
