//! Semantic validation beyond what serde enforces.

use crate::policy::{AuditPolicy, ConfigError};

/// Longest backoff accepted between retry attempts.
const MAX_BACKOFF_MS: u64 = 300_000;

/// Validate a loaded policy.
///
/// `timeout_secs == 0` is legal (disables the timeout).
pub fn validate_policy(policy: &AuditPolicy) -> Result<(), ConfigError> {
    if policy.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "retry.max_attempts must be at least 1".to_string(),
        ));
    }

    if policy.retry.backoff_ms > MAX_BACKOFF_MS {
        return Err(ConfigError::Invalid(format!(
            "retry.backoff_ms must be at most {} (got {})",
            MAX_BACKOFF_MS, policy.retry.backoff_ms
        )));
    }

    Ok(())
}
