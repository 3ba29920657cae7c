//! Appending entries by hand.

use std::io::Write;

use claw_diagnostics::{DiagnosticLog, Fault, LogContext, LogOptions};

use crate::cli::LogArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for the log command.
pub struct LogCommand<'a> {
    log: &'a DiagnosticLog,
}

impl<'a> LogCommand<'a> {
    /// Creates a new log command handler.
    #[must_use]
    pub const fn new(log: &'a DiagnosticLog) -> Self {
        Self { log }
    }

    /// Records the entry and writes it back.
    ///
    /// # Errors
    ///
    /// Returns an error if a context field is malformed or output fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &LogArgs,
    ) -> Result<(), CliError> {
        let context = parse_context(&args.context)?;

        let mut options = LogOptions::new().level(args.level).context(context);
        if let Some(status) = args.status {
            options = options.fault(Fault::http(status, args.message.clone()));
        }

        let entry = self.log.log(args.message.clone(), options);
        format.write(out, &entry)
    }
}

/// Parses `KEY=VALUE` pairs. Values that parse as JSON keep their type.
fn parse_context(pairs: &[String]) -> Result<LogContext, CliError> {
    let mut context = LogContext::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::InvalidArgument(format!(
                "context must be KEY=VALUE, got '{pair}'"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::InvalidArgument(format!(
                "context key cannot be empty in '{pair}'"
            )));
        }

        match serde_json::from_str::<serde_json::Value>(value) {
            Ok(parsed) if !parsed.is_object() && !parsed.is_array() => {
                context.insert(key, parsed);
            }
            _ => context.insert(key, value),
        }
    }
    Ok(context)
}
