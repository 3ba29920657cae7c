//! # claw-diag
//!
//! Command-line access to the diagnostic log.
//!
//! Provides commands for:
//! - Listing, searching and clearing persisted entries
//! - Appending entries by hand
//! - Probing an HTTP endpoint through the retry executor, recording every
//!   retry as a `WARNING` entry
//!
//! ```text
//! ┌───────────┐   DiagnosticLog    ┌────────────────────────┐
//! │ claw-diag │◄──────────────────►│ diagnostics.json store │
//! └─────┬─────┘                    └────────────────────────┘
//!       │ RetryExecutor (probe)
//!       ▼
//!   HTTP endpoint
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use config::{CliConfig, PolicyOverride, RetrySettings};
pub use error::CliError;
pub use output::OutputFormat;
