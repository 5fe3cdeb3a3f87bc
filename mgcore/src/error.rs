//! Error taxonomy for the mapping core.
//!
//! Four failure classes, matching the contract in SPEC_FULL.md §7:
//! invalid invocation (handled internally, never surfaced as `Err`),
//! I/O open failure, internal allocation failure, and arena leaks (an
//! assertion-failure class, not a recoverable `Error` variant).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid fragment: {reason}")]
    InvalidFragment { reason: String },

    #[error("allocation failure: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
