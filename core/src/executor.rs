//! Request execution under a retry policy.
//!
//! # Design
//! `RequestExecutor` owns the transport and the authentication strategy. Each
//! call runs the attempt loop: send, hand the response to the caller's
//! handler (status check plus mapping), and on failure ask the error whether
//! it is worth another attempt. Fatal errors leave the loop immediately; the
//! last retryable error is wrapped in `OperationFailed` with the endpoint,
//! attempt count and timeout. There is no delay between attempts.
//!
//! Access-key and legacy session clients share this loop and differ only in
//! the `Authentication` they were built with.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::connection::AccessKey;
use crate::error::{Result, TaskrowError};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::retry::RetryPolicy;
use crate::session::SessionCookies;

/// Header carrying the access key on every request.
pub const ACCESS_KEY_HEADER: &str = "__identifier";

const USER_AGENT: &str = concat!("taskrow-rs/", env!("CARGO_PKG_VERSION"));

/// Longest response body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 512;

/// How requests prove the caller's identity.
#[derive(Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Only used for the login request itself.
    Anonymous,
    AccessKey(AccessKey),
    Session(SessionCookies),
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::AccessKey(key) => f.debug_tuple("AccessKey").field(key).finish(),
            Self::Session(_) => f.write_str("Session(<cookies>)"),
        }
    }
}

/// Runs requests through a `Transport` with retries and authentication.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    auth: Authentication,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, auth: Authentication) -> Self {
        Self { transport, auth }
    }

    pub fn authentication(&self) -> &Authentication {
        &self.auth
    }

    /// Same transport, different identity.
    pub fn with_authentication(&self, auth: Authentication) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            auth,
        }
    }

    /// Attach the identity and the standard headers to a request.
    pub fn authorize(&self, request: HttpRequest) -> HttpRequest {
        let request = request
            .with_header("user-agent", USER_AGENT)
            .with_header("accept", "application/json");
        match &self.auth {
            Authentication::Anonymous => request,
            Authentication::AccessKey(key) => request.with_header(ACCESS_KEY_HEADER, key.expose()),
            Authentication::Session(cookies) => request.with_header("cookie", cookies.header_value()),
        }
    }

    /// Send `request` up to `policy.max_attempts()` times.
    ///
    /// `handle` turns a raw response into the operation's result; any error
    /// it returns is classified exactly like a transport failure.
    #[instrument(
        level = "debug",
        skip(self, request, policy, handle),
        fields(url = %request.url, max_attempts = policy.max_attempts())
    )]
    pub fn execute<T, F>(
        &self,
        operation: &'static str,
        request: HttpRequest,
        policy: RetryPolicy,
        mut handle: F,
    ) -> Result<T>
    where
        F: FnMut(HttpResponse) -> Result<T>,
    {
        let request = self.authorize(request);
        let max_attempts = policy.max_attempts();
        let timeout = policy.timeout();

        for attempt in 1..=max_attempts {
            debug!(operation, attempt, "sending request");

            let outcome = self
                .transport
                .send(&request, timeout)
                .map_err(|source| TaskrowError::Transport {
                    url: request.url.clone(),
                    source,
                })
                .and_then(|response| handle(response));

            let err = match outcome {
                Ok(value) => {
                    debug!(operation, attempt, "request succeeded");
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(operation, attempt, error = %err, "fatal error, not retrying");
                return Err(err);
            }

            if attempt == max_attempts {
                warn!(operation, attempt, error = %err, "attempts exhausted");
                return Err(TaskrowError::OperationFailed {
                    operation,
                    url: request.url.clone(),
                    attempts: max_attempts,
                    timeout_secs: policy.timeout_seconds(),
                    message: err.to_string(),
                    source: Box::new(err),
                });
            }

            warn!(operation, attempt, max_attempts, error = %err, "attempt failed, retrying");
        }

        Err(TaskrowError::Internal(format!(
            "attempt loop for {operation} exhausted without a result"
        )))
    }
}

/// Reject any response that is not a 2xx.
///
/// 401/403 and redirects (the service bounces unauthenticated callers to its
/// login page) are authentication failures; everything else keeps its status
/// so the executor can decide whether to retry.
pub fn check_status(url: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 401 || response.status == 403 {
        return Err(TaskrowError::AuthenticationFailure {
            url: url.to_string(),
            message: format!("HTTP {}: {}", response.status, excerpt(&response.body)),
        });
    }
    if response.is_redirect() {
        let location = response.header_values("location").next().unwrap_or("?");
        return Err(TaskrowError::AuthenticationFailure {
            url: url.to_string(),
            message: format!("HTTP {} redirect to {location}", response.status),
        });
    }
    Err(TaskrowError::UnexpectedStatus {
        url: url.to_string(),
        status: response.status,
        body: excerpt(&response.body),
    })
}

/// Body text trimmed for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    if body.len() <= MAX_BODY_EXCERPT {
        return body.to_string();
    }
    let mut end = MAX_BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
