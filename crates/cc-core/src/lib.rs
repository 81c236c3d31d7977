//! Cloud census engine.
//!
//! The library half of the `cloud-census` binary:
//! - [`exec`]: external command execution with timeout and retry
//! - [`scope`]: scope-unit discovery and allow-list filtering
//! - [`probe`]: resource probes and the probe registry
//! - [`census`]: the runner folding probe outcomes into a report
//! - [`providers`]: per-provider plans (commands and count rules as data)

pub mod census;
pub mod exec;
pub mod exit_codes;
pub mod logging;
pub mod probe;
pub mod providers;
pub mod scope;
