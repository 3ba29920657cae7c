//! Core types for the diagnostic log.
//!
//! This module provides:
//! - [`LogLevel`]: Ordinal severity levels
//! - [`EntryId`]: Unique, time-ordered entry identifiers
//! - [`LogContext`]: Shallow structured context attached to an entry
//! - [`LogEntry`]: Immutable structured diagnostic record
//! - [`LogQuery`]: Level/limit selection for reading the store

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fault::Fault;

/// Log severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debugging detail
    Debug = 0,
    /// Routine information
    Info = 1,
    /// Something unexpected that did not stop the operation
    Warning = 2,
    /// An operation failed
    Error = 3,
    /// A failure that compromises the application
    Critical = 4,
}

impl LogLevel {
    /// All levels in ascending severity.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Returns true if this level is at least as severe as the given level.
    #[must_use]
    pub fn is_at_least(&self, level: Self) -> bool {
        *self >= level
    }

    /// Returns the canonical upper-case name of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" | "FATAL" => Ok(Self::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a log entry.
///
/// Composed of the creation time in milliseconds, a per-process sequence
/// number and a random suffix, all hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generates a fresh identifier for an entry created at `at`.
    #[must_use]
    pub fn generate(at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().max(0);
        let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let salt: u32 = rand::random();
        Self(format!("{millis:x}-{seq:x}-{salt:08x}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured context attached to a log entry.
///
/// The map is shallow and JSON round-trippable: scalar values are kept as
/// they are, while nested objects and arrays are stored as their compact
/// JSON text. Values that cannot be serialized become `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogContext(Map<String, Value>);

impl LogContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, returning the context for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a key, flattening nested values.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.into(), flatten(value));
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

fn flatten(value: Value) -> Value {
    match value {
        nested @ (Value::Object(_) | Value::Array(_)) => Value::String(nested.to_string()),
        scalar => scalar,
    }
}

impl<K: Into<String>, V: Serialize> FromIterator<(K, V)> for LogContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}

/// An immutable structured diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique identifier for this entry
    pub id: EntryId,
    /// When the entry was created
    pub timestamp: DateTime<Utc>,
    /// Severity level
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
    /// Classification of the originating fault
    pub error_type: String,
    /// Call-site context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
    /// Agent string of the producing process
    pub user_agent: String,
    /// Location (route, URL, working directory) at log time
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Stack or source chain of the originating fault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl LogEntry {
    pub(crate) fn create(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: String,
        fault: Option<Fault>,
        context: Option<LogContext>,
        user_agent: String,
        location: Option<String>,
    ) -> Self {
        let (error_type, stack) = match fault {
            Some(fault) => (fault.error_type, fault.stack),
            None => (Fault::UNKNOWN.to_string(), None),
        };

        Self {
            id: EntryId::generate(timestamp),
            timestamp,
            level,
            message,
            error_type,
            context: context.filter(|c| !c.is_empty()),
            user_agent,
            location,
            stack,
        }
    }

    /// Checks if this entry is selected by the query's level filter.
    #[must_use]
    pub fn matches(&self, query: &LogQuery) -> bool {
        query.level.is_none_or(|level| self.level == level)
    }

    /// Case-insensitive substring match over the message and error type.
    ///
    /// `needle` must already be lower-cased.
    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.message.to_lowercase().contains(needle)
            || self.error_type.to_lowercase().contains(needle)
    }
}

/// Selection criteria for reading entries back from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    /// Only entries with exactly this level
    #[serde(default)]
    pub level: Option<LogLevel>,
    /// Only the most recent `limit` entries (after level filtering)
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LogQuery {
    /// Creates a query that selects every entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to one level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Keeps only the most recent `limit` matches.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    fn make_entry(level: LogLevel, message: &str, fault: Option<Fault>) -> LogEntry {
        LogEntry::create(
            Utc::now(),
            level,
            message.to_string(),
            fault,
            None,
            "claw-diagnostics/test".to_string(),
            None,
        )
    }

    // ===========================================
    // LogLevel Tests
    // ===========================================

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn log_level_is_at_least() {
        assert!(LogLevel::Critical.is_at_least(LogLevel::Error));
        assert!(LogLevel::Error.is_at_least(LogLevel::Error));
        assert!(!LogLevel::Warning.is_at_least(LogLevel::Error));
    }

    #[test]
    fn log_level_serializes_upper_case() {
        let json = serde_json::to_string(&LogLevel::Warning).expect("serialize");
        assert_eq!(json, "\"WARNING\"");

        let level: LogLevel = serde_json::from_str("\"CRITICAL\"").expect("deserialize");
        assert_eq!(level, LogLevel::Critical);
    }

    #[test_case("debug", LogLevel::Debug ; "lower case")]
    #[test_case("INFO", LogLevel::Info ; "upper case")]
    #[test_case("warn", LogLevel::Warning ; "short warning")]
    #[test_case("Warning", LogLevel::Warning ; "mixed case")]
    #[test_case(" error ", LogLevel::Error ; "padded")]
    #[test_case("fatal", LogLevel::Critical ; "fatal alias")]
    fn log_level_parse(input: &str, expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>(), Ok(expected));
    }

    #[test]
    fn log_level_parse_rejects_unknown() {
        let err = "verbose".parse::<LogLevel>().expect_err("unknown level");
        assert_eq!(err.to_string(), "unknown log level: verbose");
    }

    #[test]
    fn log_level_display_matches_as_str() {
        for level in LogLevel::ALL {
            assert_eq!(level.to_string(), level.as_str());
        }
    }

    // ===========================================
    // EntryId Tests
    // ===========================================

    #[test]
    fn entry_ids_are_distinct_under_rapid_generation() {
        let now = Utc::now();
        let ids: HashSet<EntryId> = (0..10_000).map(|_| EntryId::generate(now)).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn entry_id_starts_with_timestamp() {
        let now = Utc::now();
        let id = EntryId::generate(now);
        let prefix = format!("{:x}-", now.timestamp_millis());
        assert!(id.as_str().starts_with(&prefix));
    }

    // ===========================================
    // LogContext Tests
    // ===========================================

    #[test]
    fn context_keeps_scalars() {
        let context = LogContext::new()
            .with("attempt", 2)
            .with("endpoint", "/api/items")
            .with("cached", false);

        assert_eq!(context.len(), 3);
        assert_eq!(context.get("attempt"), Some(&Value::from(2)));
        assert_eq!(context.get("endpoint"), Some(&Value::from("/api/items")));
        assert_eq!(context.get("cached"), Some(&Value::from(false)));
    }

    #[test]
    fn context_flattens_nested_values() {
        let context = LogContext::new()
            .with("headers", serde_json::json!({"retry-after": 5}))
            .with("ids", vec![1, 2, 3]);

        assert_eq!(
            context.get("headers"),
            Some(&Value::from("{\"retry-after\":5}"))
        );
        assert_eq!(context.get("ids"), Some(&Value::from("[1,2,3]")));
    }

    #[test]
    fn context_from_iterator() {
        let context: LogContext = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(context.len(), 2);
        assert_eq!(context.iter().count(), 2);
    }

    #[test]
    fn context_round_trips_through_json() {
        let context = LogContext::new().with("status", 503).with("path", "/x");
        let json = serde_json::to_string(&context).expect("serialize");
        let parsed: LogContext = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, context);
    }

    // ===========================================
    // LogEntry Tests
    // ===========================================

    #[test]
    fn entry_without_fault_is_unknown() {
        let entry = make_entry(LogLevel::Info, "started", None);
        assert_eq!(entry.error_type, "Unknown");
        assert!(entry.stack.is_none());
    }

    #[test]
    fn entry_takes_fault_classification() {
        let entry = make_entry(
            LogLevel::Error,
            "fetch failed",
            Some(Fault::http(503, "Service Unavailable")),
        );
        assert_eq!(entry.error_type, "HTTP 503");
    }

    #[test]
    fn entry_drops_empty_context() {
        let entry = LogEntry::create(
            Utc::now(),
            LogLevel::Info,
            "m".to_string(),
            None,
            Some(LogContext::new()),
            String::new(),
            None,
        );
        assert!(entry.context.is_none());
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = make_entry(LogLevel::Warning, "slow", Some(Fault::message("late")));
        let json = serde_json::to_value(&entry).expect("serialize");

        assert_eq!(json["errorType"], "String");
        assert_eq!(json["level"], "WARNING");
        assert!(json.get("userAgent").is_some());
        assert!(json["timestamp"].is_string());
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let entry = LogEntry::create(
            Utc::now(),
            LogLevel::Critical,
            "disk full".to_string(),
            Some(Fault::unknown("ENOSPC").with_stack("at write()")),
            Some(LogContext::new().with("free_bytes", 0)),
            "agent".to_string(),
            Some("/settings".to_string()),
        );

        let json = serde_json::to_string(&entry).expect("serialize");
        let parsed: LogEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, entry);
    }

    #[test]
    fn contains_text_checks_message_and_error_type() {
        let entry = make_entry(
            LogLevel::Error,
            "Upload Failed",
            Some(Fault::http(413, "too large")),
        );

        assert!(entry.contains_text("upload"));
        assert!(entry.contains_text("http 4"));
        assert!(!entry.contains_text("download"));
    }

    // ===========================================
    // LogQuery Tests
    // ===========================================

    #[test]
    fn query_matches_all_by_default() {
        let entry = make_entry(LogLevel::Debug, "x", None);
        assert!(entry.matches(&LogQuery::new()));
    }

    #[test]
    fn query_matches_exact_level_only() {
        let entry = make_entry(LogLevel::Error, "x", None);
        assert!(entry.matches(&LogQuery::new().with_level(LogLevel::Error)));
        assert!(!entry.matches(&LogQuery::new().with_level(LogLevel::Warning)));
        assert!(!entry.matches(&LogQuery::new().with_level(LogLevel::Critical)));
    }

    #[test]
    fn query_builder_sets_fields() {
        let query = LogQuery::new().with_level(LogLevel::Info).with_limit(5);
        assert_eq!(query.level, Some(LogLevel::Info));
        assert_eq!(query.limit, Some(5));
    }
}
