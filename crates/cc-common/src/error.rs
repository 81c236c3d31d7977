//! Error types for cloud-census.
//!
//! Only fatal conditions live here. Recoverable per-unit probe failures
//! are [`ProbeFailure`](crate::census::ProbeFailure) values folded into
//! census records; they never cross the scope-unit iteration boundary.

use thiserror::Error;

/// Result type alias for cloud-census operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Scope discovery failures (fatal per audit target).
    Discovery,
    /// Configuration loading and validation.
    Config,
    /// Report file writing.
    Report,
    /// File I/O.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Discovery => write!(f, "discovery"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Report => write!(f, "report"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified fatal error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Scope discovery failed; there is no meaningful census without a
    /// scope set, so the current audit target aborts. Sibling targets in
    /// the same invocation continue.
    #[error("scope discovery failed for target '{target}': {detail}")]
    Discovery { target: String, detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Discovery { .. } => ErrorCategory::Discovery,
            Error::Config(_) => ErrorCategory::Config,
            Error::Report(_) => ErrorCategory::Report,
            Error::Io(_) => ErrorCategory::Io,
        }
    }
}
