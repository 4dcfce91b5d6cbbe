//! Service address and credential validation.
//!
//! Both checks run once, when a client is built, before any network call.

use std::fmt;

use url::Url;

use crate::error::{Result, TaskrowError};

/// Every tenant lives under this domain.
pub const SERVICE_HOST_SUFFIX: &str = ".taskrow.com";

/// Access keys shorter than this are rejected without contacting the service.
pub const MIN_ACCESS_KEY_LEN: usize = 20;

/// A validated tenant endpoint, normalized to its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddress {
    origin: Url,
}

impl ServiceAddress {
    /// Validate a candidate address.
    ///
    /// Fails with `InvalidAddress` when the address is absent, unparsable,
    /// carries user info, is not `https`, or is not a `*.taskrow.com` host.
    pub fn parse(candidate: Option<&str>) -> Result<Self> {
        let raw = candidate
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TaskrowError::InvalidAddress("service url is required".to_string()))?;

        let url = Url::parse(raw)
            .map_err(|e| TaskrowError::InvalidAddress(format!("{raw}: {e}")))?;

        if !url.username().is_empty() || url.password().is_some() {
            return Err(TaskrowError::InvalidAddress(format!(
                "{}: credentials are not allowed in the address",
                url.host_str().unwrap_or_default()
            )));
        }

        if url.scheme() != "https" {
            return Err(TaskrowError::InvalidAddress(format!(
                "{raw}: https:// is required"
            )));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let label = host.strip_suffix(SERVICE_HOST_SUFFIX).unwrap_or_default();
        if label.is_empty() {
            return Err(TaskrowError::InvalidAddress(format!(
                "{raw}: use the format https://yourcompany{SERVICE_HOST_SUFFIX}"
            )));
        }

        let mut origin = url;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        Ok(Self { origin })
    }

    /// Absolute URL for an endpoint path (with optional query string).
    pub fn endpoint(&self, path_and_query: &str) -> Result<Url> {
        self.origin
            .join(path_and_query)
            .map_err(|e| TaskrowError::Internal(format!("cannot join {path_and_query}: {e}")))
    }

    pub fn as_str(&self) -> &str {
        self.origin.as_str()
    }

    pub fn host(&self) -> &str {
        self.origin.host_str().unwrap_or_default()
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.origin.as_str())
    }
}

/// Opaque long-lived access key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessKey(<{} chars>)", self.0.chars().count())
    }
}

/// How a client proves its identity.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    AccessKey(AccessKey),
    /// Legacy form login; see `session`.
    EmailAndPassword { email: String, password: String },
}

impl Credential {
    pub fn access_key(key: impl Into<String>) -> Self {
        Self::AccessKey(AccessKey::new(key))
    }

    pub fn email_and_password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::EmailAndPassword {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AccessKey(key) => {
                let len = key.expose().chars().count();
                if len == 0 {
                    return Err(TaskrowError::InvalidCredential(
                        "access key is required".to_string(),
                    ));
                }
                if len < MIN_ACCESS_KEY_LEN {
                    return Err(TaskrowError::InvalidCredential(format!(
                        "access key must have at least {MIN_ACCESS_KEY_LEN} characters, got {len}"
                    )));
                }
                // Sent verbatim as a header value.
                if !key.expose().chars().all(|c| c.is_ascii_graphic()) {
                    return Err(TaskrowError::InvalidCredential(
                        "access key must contain only visible ASCII characters".to_string(),
                    ));
                }
                Ok(())
            }
            Self::EmailAndPassword { email, password } => {
                if email.trim().is_empty() {
                    return Err(TaskrowError::InvalidCredential("email is required".to_string()));
                }
                if password.is_empty() {
                    return Err(TaskrowError::InvalidCredential(
                        "password is required".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessKey(key) => f.debug_tuple("AccessKey").field(key).finish(),
            Self::EmailAndPassword { email, .. } => f
                .debug_struct("EmailAndPassword")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
