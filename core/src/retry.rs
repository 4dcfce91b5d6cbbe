//! Retry policy value object.

use std::time::Duration;

use crate::error::{Result, TaskrowError};

/// Attempts when neither the operation nor the client supplies a policy.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Per-attempt timeout when neither the operation nor the client supplies a policy.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// How many attempts an operation gets and how long each may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    timeout_seconds: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout_seconds: u64) -> Result<Self> {
        if max_attempts == 0 {
            return Err(TaskrowError::invalid_argument(
                "maxAttempts",
                "must be at least 1",
            ));
        }
        if timeout_seconds == 0 {
            return Err(TaskrowError::invalid_argument(
                "timeoutSeconds",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            max_attempts,
            timeout_seconds,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Operation override, else client default, else the built-in default.
    pub fn resolve(operation: Option<RetryPolicy>, client_default: Option<RetryPolicy>) -> Self {
        operation.or(client_default).unwrap_or_default()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}
