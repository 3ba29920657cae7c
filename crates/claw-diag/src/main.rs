//! `claw-diag` binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt, reload};

use claw_diag::cli::{Cli, Commands};
use claw_diag::commands::{ClearCommand, ListCommand, LogCommand, ProbeCommand, SearchCommand};
use claw_diag::config::CliConfig;
use claw_diag::output::OutputFormat;
use claw_diagnostics::{DiagnosticLayer, DiagnosticLog, GlobalFaultTap, SharedDiagnosticLog};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The store is attached once it is open; loading it may already warn.
    let (diagnostic_layer, diagnostic_handle) = reload::Layer::new(None::<DiagnosticLayer>);
    tracing_subscriber::registry()
        .with(diagnostic_layer)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let (config, log) = match bootstrap(&cli) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = diagnostic_handle.modify(|layer| {
        *layer = DiagnosticLayer::for_config(Arc::clone(&log), &config.diagnostics);
    }) {
        tracing::warn!(error = %e, "failed to attach diagnostic layer");
    }

    GlobalFaultTap::install(Arc::clone(&log));
    tracing::debug!(
        entries = log.len(),
        capacity = log.capacity(),
        sinks = ?log.sink_names(),
        "diagnostic store opened"
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, &config, &log)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration and opens the store.
fn bootstrap(cli: &Cli) -> anyhow::Result<(CliConfig, SharedDiagnosticLog)> {
    let config = CliConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_store(cli.store.clone());

    let log = DiagnosticLog::open(&config.diagnostics).with_context(|| {
        format!(
            "failed to open diagnostic store {}",
            config
                .diagnostics
                .storage_path
                .as_deref()
                .map_or_else(|| "<memory>".to_string(), |p| p.display().to_string())
        )
    })?;

    Ok((config, Arc::new(log)))
}

async fn run(cli: Cli, config: &CliConfig, log: &DiagnosticLog) -> Result<(), claw_diag::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::List(args) => {
            ListCommand::new(log).execute(&mut stdout, &format, &args)?;
        }
        Commands::Search { query } => {
            SearchCommand::new(log).execute(&mut stdout, &format, &query)?;
        }
        Commands::Clear => {
            ClearCommand::new(log).execute(&mut stdout, &format)?;
        }
        Commands::Log(args) => {
            LogCommand::new(log).execute(&mut stdout, &format, &args)?;
        }
        Commands::Probe(args) => {
            ProbeCommand::new(log, &config.retry)
                .execute(&mut stdout, &format, &args)
                .await?;
        }
    }

    Ok(())
}
