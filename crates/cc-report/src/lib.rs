//! Streaming report writer for cloud-census.
//!
//! One report file per audit target. The writer appends one line per
//! finalized census record and flushes after every write, so a crash
//! mid-run leaves a valid partial report rather than an empty or
//! truncated one.

pub mod error;
pub mod writer;

pub use error::ReportError;
pub use writer::{report_file_name, ReportWriter};
