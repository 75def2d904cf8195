//! Provider configuration helpers.

use crate::error::BackendError;

/// Read a required environment variable (endpoint, key, or DSN).
pub(crate) fn require_env(var: &str) -> Result<String, BackendError> {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(BackendError::Config(format!("{var} is not set"))),
    }
}
