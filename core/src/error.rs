//! Error types for the Taskrow client.
//!
//! # Design
//! Every failure the client can surface lands in `TaskrowError`. The request
//! executor consults `is_retryable` after each attempt: validation and
//! authentication problems are fatal and propagate at once, while transport
//! faults, server-side 5xx statuses and undecodable bodies are retried until
//! the policy runs out, then wrapped in `OperationFailed`.

use thiserror::Error;

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, TaskrowError>;

/// Low-level transport failure categories reported by a `Transport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The per-attempt deadline elapsed.
    Timeout,
    /// DNS, TCP or TLS setup failed.
    Connect,
    /// The connection broke while reading or writing.
    Io,
    /// Anything the transport could not classify further.
    Other,
}

/// A failure reported by `Transport::send`, before any status is known.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors returned by `TaskrowClient` and its building blocks.
#[derive(Debug, Error)]
pub enum TaskrowError {
    /// Service address missing, not https, or not a Taskrow host.
    #[error("invalid service address: {0}")]
    InvalidAddress(String),

    /// Credential missing or of the wrong shape.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The service rejected the credential.
    #[error("authentication failed -- url: {url} -- {message}")]
    AuthenticationFailure { url: String, message: String },

    /// A caller-supplied argument was rejected before any network call.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The response body does not match the expected wire schema.
    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    /// The service answered with a status the operation does not accept.
    #[error("HTTP {status} from {url}: {body}")]
    UnexpectedStatus { url: String, status: u16, body: String },

    /// The request never produced a response.
    #[error("transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    /// All attempts allowed by the retry policy failed.
    #[error(
        "error in {operation} after {attempts} attempt(s) -- url: {url} -- error: {message} -- timeout: {timeout_secs} seconds"
    )]
    OperationFailed {
        operation: &'static str,
        url: String,
        attempts: u32,
        timeout_secs: u64,
        message: String,
        #[source]
        source: Box<TaskrowError>,
    },

    /// Client configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TaskrowError {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(url: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Whether another attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::MalformedResponse { .. } => true,
            Self::UnexpectedStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::InvalidAddress(_)
            | Self::InvalidCredential(_)
            | Self::AuthenticationFailure { .. }
            | Self::InvalidArgument { .. }
            | Self::OperationFailed { .. }
            | Self::Config(_)
            | Self::Internal(_) => false,
        }
    }

    /// Number of attempts recorded on an `OperationFailed`, if any.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::OperationFailed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
