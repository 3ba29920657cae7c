//! Probing an HTTP endpoint under a retry policy.
//!
//! Every retried failure is recorded as a `WARNING` entry; the final outcome
//! is recorded as `INFO` (success) or `ERROR` (gave up).

use std::io::Write;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;

use claw_diagnostics::{DiagnosticLog, Fault, LogContext};
use claw_retry::{Classify, ErrorClass, RetryExecutor, RetryPolicy, classify_status};

use crate::cli::{PolicyKind, ProbeArgs};
use crate::config::RetrySettings;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// A failed probe attempt.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} {reason}")]
    Status {
        /// Status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl ProbeError {
    /// Classified fault for the diagnostic log.
    #[must_use]
    pub fn fault(&self) -> Fault {
        match self {
            Self::Status { status, reason } => Fault::http(*status, reason.clone()),
            Self::Transport(e) => Fault::from_error(e),
        }
    }
}

impl Classify for ProbeError {
    fn classify(&self) -> ErrorClass {
        match self {
            Self::Status { status, .. } => classify_status(*status),
            Self::Transport(e) if e.is_timeout() || e.is_connect() => ErrorClass::Transient,
            Self::Transport(_) => ErrorClass::Permanent,
        }
    }
}

/// Handler for the probe command.
pub struct ProbeCommand<'a> {
    log: &'a DiagnosticLog,
    retry: &'a RetrySettings,
}

impl<'a> ProbeCommand<'a> {
    /// Creates a new probe command handler.
    #[must_use]
    pub const fn new(log: &'a DiagnosticLog, retry: &'a RetrySettings) -> Self {
        Self { log, retry }
    }

    /// Requests the URL until it answers with success or the policy gives up.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the probe gives up, or output
    /// fails. The report is written before a probe failure is returned.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ProbeArgs,
    ) -> Result<(), CliError> {
        let url = Url::parse(&args.url)
            .map_err(|e| CliError::InvalidArgument(format!("invalid URL '{}': {e}", args.url)))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(args.timeout_ms))
            .build()
            .map_err(|e| CliError::Probe(format!("failed to build HTTP client: {e}")))?;

        let policy = self.policy(args);
        let observer = |attempt: u32, error: &ProbeError| {
            self.log.warn(
                format!("probe of {url} failed on attempt {attempt}, retrying: {error}"),
                Some(error.fault()),
                Some(
                    LogContext::new()
                        .with("url", url.as_str())
                        .with("attempt", attempt)
                        .with("policy", policy.name()),
                ),
            );
        };

        let outcome = RetryExecutor::new()
            .run_with_outcome(&policy, || probe_once(&client, url.clone()), &observer)
            .await;

        let context = LogContext::new()
            .with("url", url.as_str())
            .with("attempts", outcome.attempts)
            .with("policy", policy.name());
        let report = ProbeReport {
            url: url.to_string(),
            policy: policy.name().to_string(),
            attempts: outcome.attempts,
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            status: outcome.result.as_ref().ok().copied(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
        };

        match &outcome.result {
            Ok(status) => {
                self.log
                    .info(format!("probe of {url} answered {status}"), None, Some(context));
            }
            Err(error) => {
                self.log.error(
                    format!("probe of {url} gave up: {error}"),
                    Some(error.fault()),
                    Some(context),
                );
            }
        }

        format.write(out, &report)?;

        match outcome.result {
            Ok(_) => Ok(()),
            Err(error) => Err(CliError::Probe(format!(
                "{error} after {} attempts",
                outcome.attempts
            ))),
        }
    }

    fn policy(&self, args: &ProbeArgs) -> RetryPolicy<ProbeError> {
        let policy = match args.policy {
            PolicyKind::Query => self.retry.query.apply(RetryPolicy::query()),
            PolicyKind::Mutation => self.retry.mutation.apply(RetryPolicy::mutation()),
        };
        match args.attempts {
            Some(max) => policy.with_max_attempts(max),
            None => policy,
        }
    }
}

async fn probe_once(client: &Client, url: Url) -> Result<u16, ProbeError> {
    let response = client.get(url).send().await.map_err(ProbeError::Transport)?;
    let status = response.status();

    if status.is_success() {
        Ok(status.as_u16())
    } else {
        Err(ProbeError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}

/// Result of a probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Requested URL.
    pub url: String,
    /// Policy used.
    pub policy: String,
    /// Attempts made.
    pub attempts: u32,
    /// Total time, including delays.
    pub elapsed_ms: u64,
    /// Success status, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Final error, if the probe gave up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableDisplay for ProbeReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Probe {}", self.url)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Policy:      {}", self.policy)?;
        writeln!(writer, "Attempts:    {}", self.attempts)?;
        writeln!(writer, "Elapsed:     {} ms", self.elapsed_ms)?;
        match (&self.status, &self.error) {
            (Some(status), _) => writeln!(writer, "Result:      {status}")?,
            (None, Some(error)) => writeln!(writer, "Result:      failed ({error})")?,
            (None, None) => writeln!(writer, "Result:      unknown")?,
        }
        Ok(())
    }
}
