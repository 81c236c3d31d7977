//! Cloud census shared types.
//!
//! Foundational types shared across the cloud-census crates:
//! - Scope units and scope kinds (the iteration boundary of a census)
//! - Census records, totals, and probe failure types
//! - The unified error type

pub mod census;
pub mod error;
pub mod scope;

pub use census::{CensusRecord, FailedUnit, FailureKind, ProbeFailure, Totals};
pub use error::{Error, ErrorCategory, Result};
pub use scope::{ScopeKind, ScopeUnit};
