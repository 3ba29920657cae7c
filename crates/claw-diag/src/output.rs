//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;

use claw_diagnostics::LogEntry;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Entries for display, oldest first.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct EntryList {
    /// The entries.
    pub entries: Vec<LogEntry>,
}

impl TableDisplay for EntryList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.entries.is_empty() {
            writeln!(writer, "No entries.")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<20}  {:<8}  {:<16}  MESSAGE",
            "TIMESTAMP", "LEVEL", "TYPE"
        )?;
        for entry in &self.entries {
            writeln!(
                writer,
                "{:<20}  {:<8}  {:<16}  {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.level.as_str(),
                truncate(&entry.error_type, 16),
                entry.message
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "{} entries", self.entries.len())?;
        Ok(())
    }
}

impl TableDisplay for LogEntry {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Entry {}", self.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Timestamp:   {}", self.timestamp.to_rfc3339())?;
        writeln!(writer, "Level:       {}", self.level)?;
        writeln!(writer, "Type:        {}", self.error_type)?;
        writeln!(writer, "Message:     {}", self.message)?;
        if let Some(context) = &self.context {
            writeln!(writer, "Context:")?;
            for (key, value) in context.iter() {
                writeln!(writer, "  {key}: {value}")?;
            }
        }
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claw_diagnostics::{DiagnosticLog, Fault, LogContext, LogQuery};

    fn sample_entries() -> Vec<LogEntry> {
        let log = DiagnosticLog::new(10);
        log.info("service started", None, None);
        log.error(
            "refresh failed",
            Some(Fault::http(503, "Service Unavailable")),
            Some(LogContext::new().with("attempt", 2)),
        );
        log.get_logs(&LogQuery::new())
    }

    #[test]
    fn entry_list_table() {
        let list = EntryList {
            entries: sample_entries(),
        };
        let out = OutputFormat::default().to_string(&list).expect("render");

        assert!(out.contains("TIMESTAMP"));
        assert!(out.contains("HTTP 503"));
        assert!(out.contains("refresh failed"));
        assert!(out.contains("2 entries"));
    }

    #[test]
    fn empty_list_table() {
        let list = EntryList { entries: vec![] };
        let out = OutputFormat::default().to_string(&list).expect("render");
        assert_eq!(out, "No entries.\n");
    }

    #[test]
    fn entry_list_json_is_array() {
        let list = EntryList {
            entries: sample_entries(),
        };
        let out = OutputFormat::new(Format::Json).to_string(&list).expect("render");
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");

        let array = value.as_array().expect("array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[1]["level"], "ERROR");
        assert_eq!(array[1]["errorType"], "HTTP 503");
    }

    #[test]
    fn single_entry_table() {
        let entries = sample_entries();
        let out = OutputFormat::default().to_string(&entries[1]).expect("render");
        assert!(out.contains("Level:       ERROR"));
        assert!(out.contains("attempt: 2"));
    }

    #[test]
    fn truncate_long_values() {
        assert_eq!(truncate("short", 16), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
