//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`entries`] - Listing, searching and clearing stored entries
//! - [`log`] - Appending an entry
//! - [`probe`] - Requesting a URL under a retry policy

pub mod entries;
pub mod log;
pub mod probe;

pub use entries::{ClearCommand, ListCommand, SearchCommand};
pub use log::LogCommand;
pub use probe::{ProbeCommand, ProbeError, ProbeReport};
