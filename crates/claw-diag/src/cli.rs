//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use claw_diagnostics::LogLevel;

/// Inspect the diagnostic log and probe endpoints with retries.
#[derive(Parser, Debug, Clone)]
#[command(name = "claw-diag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, env = "CLAW_DIAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Diagnostic store file, overriding the configured path.
    #[arg(short, long, env = "CLAW_DIAG_STORE")]
    pub store: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List stored entries, oldest first.
    List(ListArgs),

    /// Find entries whose message or error type contains a string.
    Search {
        /// Case-insensitive text to look for.
        query: String,
    },

    /// Remove every stored entry.
    Clear,

    /// Append an entry.
    Log(LogArgs),

    /// Request a URL through the retry executor, logging each retry.
    Probe(ProbeArgs),
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only entries at exactly this level.
    #[arg(short, long, value_parser = parse_level)]
    pub level: Option<LogLevel>,

    /// Only the most recent N matching entries.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for the log command.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Entry message.
    pub message: String,

    /// Severity.
    #[arg(short, long, value_parser = parse_level, default_value = "INFO")]
    pub level: LogLevel,

    /// Classify the entry as a failed HTTP call with this status.
    #[arg(long)]
    pub status: Option<u16>,

    /// Context fields (KEY=VALUE).
    #[arg(long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,
}

/// Named retry policy to probe with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PolicyKind {
    /// Idempotent read: every failure is retried.
    #[default]
    Query,
    /// Write: only transient failures are retried.
    Mutation,
}

/// Arguments for the probe command.
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// URL to request.
    pub url: String,

    /// Retry policy.
    #[arg(short, long, value_enum, default_value_t = PolicyKind::Query)]
    pub policy: PolicyKind,

    /// Override the policy's attempt budget.
    #[arg(short, long)]
    pub attempts: Option<u32>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub timeout_ms: u64,
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    s.parse::<LogLevel>().map_err(|e| e.to_string())
}
