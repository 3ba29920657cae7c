//! # claw-retry
//!
//! Bounded, observable re-attempts for flaky asynchronous operations.
//!
//! This crate provides:
//!
//! - [`RetryPolicy`]: Named attempt budget, [`Backoff`] rule and retry predicate
//! - [`RetryExecutor`]: Runs an operation under a policy
//! - [`RetryObserver`]: Notified before every retry
//! - [`Classify`] / [`classify_status`]: Transient vs. permanent failures
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use claw_retry::{Backoff, RetryExecutor, RetryPolicy};
//!
//! # async fn fetch() -> Result<u32, std::io::Error> { Ok(7) }
//! # async fn demo() -> Result<(), std::io::Error> {
//! let policy = RetryPolicy::new("fetch", 3, Backoff::fixed(Duration::from_millis(10)));
//! let executor = RetryExecutor::new();
//!
//! let value = executor
//!     .run(&policy, fetch, &|attempt: u32, err: &std::io::Error| {
//!         eprintln!("attempt {attempt} failed: {err}");
//!     })
//!     .await?;
//! assert_eq!(value, 7);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod classify;
pub mod error;
pub mod executor;
pub mod policy;

// Re-export main types
pub use backoff::Backoff;
pub use classify::{Classify, ErrorClass, StatusClassifier, classify_status};
pub use error::RetryError;
pub use executor::{NoopObserver, RetryExecutor, RetryObserver, RetryOutcome};
pub use policy::{RetryPolicy, RetryPredicate};
