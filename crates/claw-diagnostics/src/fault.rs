//! Classification of the fault behind a log call.
//!
//! A [`Fault`] carries the `error_type` and optional stack text that end up
//! on a [`LogEntry`](crate::LogEntry). Native errors are classified by their
//! type name, HTTP failures by status code, and plain messages as `"String"`.

use std::error::Error;
use std::fmt::Write as _;

/// The classified fault attached to a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Classification, e.g. `io::Error`, `HTTP 503`, `String`
    pub error_type: String,
    /// Display text of the fault
    pub message: String,
    /// Source chain or backtrace, if any
    pub stack: Option<String>,
}

impl Fault {
    /// Classification used when no fault is supplied or it cannot be typed.
    pub const UNKNOWN: &'static str = "Unknown";
    /// Classification for plain-text faults.
    pub const STRING: &'static str = "String";

    /// Classifies a typed error by its type name and renders its source chain.
    #[must_use]
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        Self {
            error_type: short_type_name(std::any::type_name::<E>()),
            message: error.to_string(),
            stack: source_chain(error),
        }
    }

    /// Classifies a type-erased error under an explicit type name.
    #[must_use]
    pub fn from_dyn(error: &(dyn Error + 'static), error_type: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: error.to_string(),
            stack: source_chain(error),
        }
    }

    /// Classifies an HTTP failure into its status bucket.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            error_type: format!("HTTP {status}"),
            message: message.into(),
            stack: None,
        }
    }

    /// A plain-text fault.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error_type: Self::STRING.to_string(),
            message: message.into(),
            stack: None,
        }
    }

    /// A fault whose nature is not known.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            error_type: Self::UNKNOWN.to_string(),
            message: message.into(),
            stack: None,
        }
    }

    /// Attaches stack text, replacing any source chain.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        let stack = stack.into();
        self.stack = (!stack.is_empty()).then_some(stack);
        self
    }
}

impl From<&str> for Fault {
    fn from(message: &str) -> Self {
        Self::message(message)
    }
}

impl From<String> for Fault {
    fn from(message: String) -> Self {
        Self::message(message)
    }
}

/// Reduces a full type path to a readable class name.
///
/// `std::io::error::Error` becomes `io::Error`, `my_crate::FetchError<T>`
/// becomes `FetchError`.
fn short_type_name(full: &str) -> String {
    let path = full.split('<').next().unwrap_or(full);
    let mut segments = path.rsplit("::");
    let Some(last) = segments.next() else {
        return Fault::UNKNOWN.to_string();
    };

    if last != "Error" {
        return last.to_string();
    }

    match segments.find(|s| *s != "error") {
        Some(module) if !matches!(module, "std" | "core" | "alloc") => format!("{module}::{last}"),
        _ => last.to_string(),
    }
}

fn source_chain(error: &(dyn Error + 'static)) -> Option<String> {
    let mut rendered = String::new();
    let mut current = error.source();
    while let Some(cause) = current {
        if !rendered.is_empty() {
            rendered.push('\n');
        }
        let _ = write!(rendered, "caused by: {cause}");
        current = cause.source();
    }
    (!rendered.is_empty()).then_some(rendered)
}
