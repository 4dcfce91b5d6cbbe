//! Retry behavior seen through the public client.
//!
//! # Design
//! A scripted transport replays canned outcomes and records the timeout of
//! every attempt, so each test can check how many attempts an operation made
//! and which policy it resolved to, without any network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskrow_core::{
    HttpRequest, HttpResponse, RetryPolicy, TaskReference, TaskrowClient, TaskrowError, Transport,
    TransportError, TransportErrorKind,
};

type Outcome = Result<HttpResponse, TransportError>;

struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            timeouts: Mutex::new(Vec::new()),
        })
    }

    fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, _request: &HttpRequest, timeout: Duration) -> Outcome {
        self.timeouts.lock().unwrap().push(timeout);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new(TransportErrorKind::Other, "script exhausted")))
    }
}

fn respond(status: u16, body: &str) -> Outcome {
    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    })
}

fn timeout() -> Outcome {
    Err(TransportError::new(TransportErrorKind::Timeout, "timed out"))
}

const GROUPS: &str = r#"{"Groups":[{"GroupID":1,"GroupName":"Ops"}]}"#;

fn client(transport: Arc<ScriptedTransport>, default: Option<RetryPolicy>) -> TaskrowClient {
    let mut builder = TaskrowClient::builder()
        .service_url("https://acme.taskrow.com")
        .access_key("0123456789abcdefghij")
        .transport(transport);
    if let Some(policy) = default {
        builder = builder.default_policy(policy);
    }
    builder.build().unwrap()
}

// ---------------------------------------------------------------------------
// Policy resolution
// ---------------------------------------------------------------------------

#[test]
fn built_in_policy_is_one_attempt_of_120_seconds() {
    let transport = ScriptedTransport::new(vec![timeout(), respond(200, GROUPS)]);
    let err = client(transport.clone(), None).list_groups(None).unwrap_err();

    assert_eq!(err.attempts(), Some(1));
    assert_eq!(transport.timeouts(), vec![Duration::from_secs(120)]);
}

#[test]
fn client_default_applies_when_operation_has_none() {
    let transport = ScriptedTransport::new(vec![timeout(), timeout(), respond(200, GROUPS)]);
    let client = client(transport.clone(), Some(RetryPolicy::new(3, 9).unwrap()));

    let groups = client.list_groups(None).unwrap();
    assert_eq!(groups[0].group_name, "Ops");
    assert_eq!(transport.timeouts(), vec![Duration::from_secs(9); 3]);
}

#[test]
fn operation_policy_overrides_client_default() {
    let transport = ScriptedTransport::new(vec![timeout(), respond(200, GROUPS)]);
    let client = client(transport.clone(), Some(RetryPolicy::new(1, 9).unwrap()));

    client.list_groups(RetryPolicy::new(2, 4).unwrap()).unwrap();
    assert_eq!(transport.timeouts(), vec![Duration::from_secs(4); 2]);
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn malformed_body_is_retried() {
    let transport = ScriptedTransport::new(vec![respond(200, "<html>busy</html>"), respond(200, GROUPS)]);
    let groups = client(transport.clone(), None)
        .list_groups(RetryPolicy::new(2, 3).unwrap())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(transport.timeouts().len(), 2);
}

#[test]
fn every_attempt_failing_reports_the_count() {
    let transport = ScriptedTransport::new((0..4).map(|_| respond(500, "boom")).collect());
    let err = client(transport.clone(), None)
        .list_users(RetryPolicy::new(4, 2).unwrap())
        .unwrap_err();

    assert_eq!(transport.timeouts().len(), 4);
    assert_eq!(err.attempts(), Some(4));
    let message = err.to_string();
    assert!(message.contains("list users"), "{message}");
    assert!(message.contains("timeout: 2 seconds"), "{message}");
}

#[test]
fn redirect_to_login_is_fatal() {
    let transport = ScriptedTransport::new(vec![
        Ok(HttpResponse {
            status: 302,
            headers: vec![("Location".to_string(), "/Login".to_string())],
            body: String::new(),
        }),
        respond(200, GROUPS),
    ]);
    let err = client(transport.clone(), None)
        .list_groups(RetryPolicy::new(5, 1).unwrap())
        .unwrap_err();

    assert!(matches!(err, TaskrowError::AuthenticationFailure { ref message, .. } if message.contains("/Login")));
    assert_eq!(transport.timeouts().len(), 1);
}

#[test]
fn not_found_is_fatal() {
    let transport = ScriptedTransport::new(vec![respond(404, "missing"), respond(200, "{}")]);
    let err = client(transport.clone(), None)
        .get_task_detail(&TaskReference::new("acme", 1, 2), RetryPolicy::new(3, 1).unwrap())
        .unwrap_err();

    assert!(matches!(err, TaskrowError::UnexpectedStatus { status: 404, .. }));
    assert_eq!(err.attempts(), None);
    assert_eq!(transport.timeouts().len(), 1);
}

#[test]
fn invalid_arguments_never_reach_the_transport() {
    let transport = ScriptedTransport::new(Vec::new());
    let client = client(transport.clone(), Some(RetryPolicy::new(3, 1).unwrap()));

    assert!(matches!(
        client.get_user(0, None),
        Err(TaskrowError::InvalidArgument { name: "userID", .. })
    ));
    assert!(matches!(
        client.list_tasks_by_group(0, None, None),
        Err(TaskrowError::InvalidArgument { name: "groupID", .. })
    ));
    assert!(matches!(
        client.get_task_detail(&TaskReference::new(" ", 1, 1), None),
        Err(TaskrowError::InvalidArgument { name: "clientNickname", .. })
    ));
    assert!(transport.timeouts().is_empty());
}

#[test]
fn unusable_access_key_fails_before_any_attempt() {
    let transport = ScriptedTransport::new(vec![respond(200, GROUPS)]);
    let err = TaskrowClient::builder()
        .service_url("https://acme.taskrow.com")
        .access_key("0123456789\nabcdefghij")
        .default_policy(RetryPolicy::new(4, 2).unwrap())
        .transport(transport.clone())
        .build()
        .unwrap_err();

    assert!(matches!(err, TaskrowError::InvalidCredential(_)), "{err:?}");
    assert!(transport.timeouts().is_empty());
}
