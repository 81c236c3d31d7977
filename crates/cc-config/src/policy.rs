//! Audit policy types.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating a policy.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid policy: {0}")]
    Invalid(String),
}

/// Behavior when scope discovery fails for a target.
///
/// The source variants of this tool disagreed here: most aborted the
/// target, one silently continued with an empty scope list. The choice is
/// explicit configuration now.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryFailureMode {
    /// Abort the target's entire run; sibling targets continue.
    #[default]
    Abort,
    /// Continue with an empty scope list; the report ends up header plus
    /// a zero TOTAL row.
    EmptyScope,
}

/// Uniform retry policy applied at the external-call boundary, to
/// discovery and probe execution alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per command (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Complete audit policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    /// Per-command timeout in seconds; 0 disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub on_discovery_failure: DiscoveryFailureMode,

    /// Directory report files are written to (default: current directory).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
            on_discovery_failure: DiscoveryFailureMode::default(),
            output_dir: None,
        }
    }
}

impl AuditPolicy {
    /// Effective per-command timeout; `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Load a policy from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = AuditPolicy::default();
        assert_eq!(policy.timeout_secs, 120);
        assert_eq!(policy.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(policy.retry.max_attempts, 1);
        assert_eq!(policy.on_discovery_failure, DiscoveryFailureMode::Abort);
        assert!(policy.output_dir.is_none());
    }

    #[test]
    fn zero_timeout_disables() {
        let policy = AuditPolicy {
            timeout_secs: 0,
            ..AuditPolicy::default()
        };
        assert_eq!(policy.timeout(), None);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let policy: AuditPolicy = toml::from_str("timeout_secs = 30").unwrap();
        assert_eq!(policy.timeout_secs, 30);
        assert_eq!(policy.retry, RetryPolicy::default());
    }

    #[test]
    fn discovery_mode_round_trips_kebab_case() {
        let policy: AuditPolicy =
            toml::from_str("on_discovery_failure = \"empty-scope\"").unwrap();
        assert_eq!(
            policy.on_discovery_failure,
            DiscoveryFailureMode::EmptyScope
        );
    }
}
