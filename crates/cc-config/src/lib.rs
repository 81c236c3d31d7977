//! Audit policy configuration for cloud-census.
//!
//! This crate provides:
//! - Typed structs for config.toml
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Semantic validation beyond what serde enforces

pub mod policy;
pub mod resolve;
pub mod validate;

pub use policy::{AuditPolicy, ConfigError, DiscoveryFailureMode, RetryPolicy};
pub use resolve::{resolve_config_file, ConfigSource};
pub use validate::validate_policy;
