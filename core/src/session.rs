//! Legacy email/password login.
//!
//! The service's older authentication posts a login form and answers with
//! two cookies that must accompany every later request. The login request
//! goes through the regular `RequestExecutor` with anonymous authentication;
//! the executor built afterwards carries the cookies instead of an access key.

use std::fmt;

use tracing::info;
use url::form_urlencoded;

use crate::connection::ServiceAddress;
use crate::error::{Result, TaskrowError};
use crate::executor::{excerpt, Authentication, RequestExecutor};
use crate::http::{HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;

pub const LOGIN_PATH: &str = "/LoginPassword";
pub const AUTH_TICKET_COOKIE: &str = "AUTHTICKET";
pub const AUTH_TICKET_VOL_COOKIE: &str = "AUTHTICKETVOL";

/// The cookie pair issued by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookies {
    auth_ticket: String,
    auth_ticket_vol: String,
}

impl SessionCookies {
    pub fn new(auth_ticket: impl Into<String>, auth_ticket_vol: impl Into<String>) -> Self {
        Self {
            auth_ticket: auth_ticket.into(),
            auth_ticket_vol: auth_ticket_vol.into(),
        }
    }

    /// Value for a `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!(
            "{AUTH_TICKET_COOKIE}={}; {AUTH_TICKET_VOL_COOKIE}={}",
            self.auth_ticket, self.auth_ticket_vol
        )
    }

    /// Pull both cookies out of a login response's `Set-Cookie` headers.
    pub fn from_response(response: &HttpResponse) -> Option<Self> {
        let mut ticket = None;
        let mut vol = None;
        for header in response.header_values("set-cookie") {
            let Some((name, rest)) = header.split_once('=') else {
                continue;
            };
            let value = rest.split(';').next().unwrap_or_default().trim();
            if value.is_empty() {
                continue;
            }
            match name.trim() {
                AUTH_TICKET_COOKIE => ticket = Some(value.to_string()),
                AUTH_TICKET_VOL_COOKIE => vol = Some(value.to_string()),
                _ => {}
            }
        }
        Some(Self::new(ticket?, vol?))
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCookies(<redacted>)")
    }
}

/// Log in with email and password and return the session cookies.
///
/// A response without both cookies is an `AuthenticationFailure`, which the
/// executor does not retry. 5xx, 408 and 429 stay `UnexpectedStatus` so the
/// policy can retry them.
pub fn login(
    executor: &RequestExecutor,
    address: &ServiceAddress,
    email: &str,
    password: &str,
    policy: RetryPolicy,
) -> Result<SessionCookies> {
    let url = address.endpoint(LOGIN_PATH)?.to_string();
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("email", email)
        .append_pair("password", password)
        .finish();

    let anonymous = executor.with_authentication(Authentication::Anonymous);
    let cookies = anonymous.execute("login", HttpRequest::post_form(&url, body), policy, |response| {
        if response.status >= 500 || matches!(response.status, 408 | 429) {
            return Err(TaskrowError::UnexpectedStatus {
                url: url.clone(),
                status: response.status,
                body: excerpt(&response.body),
            });
        }
        SessionCookies::from_response(&response).ok_or_else(|| TaskrowError::AuthenticationFailure {
            url: url.clone(),
            message: format!("login rejected for {email}; check service url, email and password"),
        })
    })?;

    info!(host = address.host(), email, "session login succeeded");
    Ok(cookies)
}
