//! Client configuration loading.
//!
//! ## Environment Variables
//! - `TASKROW_SERVICE_URL`: tenant address, e.g. `https://acme.taskrow.com`
//! - `TASKROW_ACCESS_KEY`: access key sent with every request
//! - `TASKROW_MAX_ATTEMPTS`: default attempts per operation (optional, 1)
//! - `TASKROW_TIMEOUT_SECONDS`: default per-attempt timeout (optional, 120)
//!
//! ## File
//! A JSON document with the same fields in camelCase:
//! `{"serviceUrl": "...", "accessKey": "...", "maxAttempts": 3, "timeoutSeconds": 60}`.
//! `load` falls back to `./taskrow.json` when the environment is incomplete.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TaskrowError};
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS};

pub const ENV_SERVICE_URL: &str = "TASKROW_SERVICE_URL";
pub const ENV_ACCESS_KEY: &str = "TASKROW_ACCESS_KEY";
pub const ENV_MAX_ATTEMPTS: &str = "TASKROW_MAX_ATTEMPTS";
pub const ENV_TIMEOUT_SECONDS: &str = "TASKROW_TIMEOUT_SECONDS";

/// Default file read by `load`.
pub const DEFAULT_CONFIG_FILE: &str = "taskrow.json";

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub service_url: String,
    pub access_key: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("service_url", &self.service_url)
            .field("access_key", &"<redacted>")
            .field("max_attempts", &self.max_attempts)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl ClientConfig {
    /// Environment first, then `./taskrow.json`.
    pub fn load() -> Result<Self> {
        match Self::from_env() {
            Ok(config) => {
                tracing::info!("taskrow configuration loaded from environment");
                Ok(config)
            }
            Err(e) => {
                tracing::debug!(error = %e, "environment incomplete, trying {DEFAULT_CONFIG_FILE}");
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TaskrowError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| TaskrowError::Config(format!("invalid {}: {e}", path.display())))?;
        config.retry_policy()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| TaskrowError::Config(format!("{name} is not set")))
        };

        let service_url = required(ENV_SERVICE_URL)?;
        let access_key = required(ENV_ACCESS_KEY)?;
        let max_attempts = match lookup(ENV_MAX_ATTEMPTS) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| TaskrowError::Config(format!("invalid {ENV_MAX_ATTEMPTS}: {e}")))?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        let timeout_seconds = match lookup(ENV_TIMEOUT_SECONDS) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| TaskrowError::Config(format!("invalid {ENV_TIMEOUT_SECONDS}: {e}")))?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        let config = Self {
            service_url,
            access_key,
            max_attempts,
            timeout_seconds,
        };
        config.retry_policy()?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(self.max_attempts, self.timeout_seconds)
            .map_err(|e| TaskrowError::Config(e.to_string()))
    }
}
