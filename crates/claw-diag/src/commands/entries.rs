//! Reading and clearing stored entries.

use std::io::Write;

use serde::Serialize;

use claw_diagnostics::{DiagnosticLog, LogQuery};

use crate::cli::ListArgs;
use crate::error::CliError;
use crate::output::{EntryList, OutputFormat, TableDisplay};

/// Handler for the list command.
pub struct ListCommand<'a> {
    log: &'a DiagnosticLog,
}

impl<'a> ListCommand<'a> {
    /// Creates a new list command handler.
    #[must_use]
    pub const fn new(log: &'a DiagnosticLog) -> Self {
        Self { log }
    }

    /// Writes the selected entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ListArgs,
    ) -> Result<(), CliError> {
        let mut query = LogQuery::new();
        if let Some(level) = args.level {
            query = query.with_level(level);
        }
        if let Some(limit) = args.limit {
            query = query.with_limit(limit);
        }

        let list = EntryList {
            entries: self.log.get_logs(&query),
        };
        format.write(out, &list)
    }
}

/// Handler for the search command.
pub struct SearchCommand<'a> {
    log: &'a DiagnosticLog,
}

impl<'a> SearchCommand<'a> {
    /// Creates a new search command handler.
    #[must_use]
    pub const fn new(log: &'a DiagnosticLog) -> Self {
        Self { log }
    }

    /// Writes every entry matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is blank or output fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        query: &str,
    ) -> Result<(), CliError> {
        if query.trim().is_empty() {
            return Err(CliError::InvalidArgument(
                "search query cannot be empty".to_string(),
            ));
        }

        let list = EntryList {
            entries: self.log.search_logs(query),
        };
        format.write(out, &list)
    }
}

/// Handler for the clear command.
pub struct ClearCommand<'a> {
    log: &'a DiagnosticLog,
}

impl<'a> ClearCommand<'a> {
    /// Creates a new clear command handler.
    #[must_use]
    pub const fn new(log: &'a DiagnosticLog) -> Self {
        Self { log }
    }

    /// Removes every entry and reports how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let removed = self.log.len();
        self.log.clear_logs();
        format.write(out, &ClearSummary { removed })
    }
}

/// Result of the clear command.
#[derive(Debug, Clone, Serialize)]
pub struct ClearSummary {
    /// Entries removed.
    pub removed: usize,
}

impl TableDisplay for ClearSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Cleared {} entries.", self.removed)?;
        Ok(())
    }
}
