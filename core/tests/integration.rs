//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and exercises every client
//! operation over real HTTP with `UreqTransport`. Client addresses must be
//! `https://<tenant>.taskrow.com`, so a loopback transport rewrites that
//! origin to the mock's `http://127.0.0.1:<port>` before handing the request
//! to ureq. Everything above the socket runs exactly as in production.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use mock_server::MockState;
use taskrow_core::{
    Credential, HttpRequest, HttpResponse, RetryPolicy, SaveTaskRequest, TaskReference, TaskSituation,
    TaskrowClient, TaskrowError, Transport, TransportError, UreqTransport,
};

const TENANT: &str = "https://acme.taskrow.com";

/// Sends tenant requests to the local mock instead.
struct LoopbackTransport {
    origin: String,
    inner: UreqTransport,
}

impl Transport for LoopbackTransport {
    fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let mut request = request.clone();
        request.url = request.url.replacen(TENANT, &self.origin, 1);
        self.inner.send(&request, timeout)
    }
}

fn start_mock() -> (SocketAddr, MockState) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = MockState::new();
    let server_state = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_state).await
        })
        .unwrap();
    });

    (addr, state)
}

fn loopback(addr: SocketAddr) -> Arc<LoopbackTransport> {
    Arc::new(LoopbackTransport {
        origin: format!("http://{addr}"),
        inner: UreqTransport::new(),
    })
}

fn key_client(addr: SocketAddr) -> TaskrowClient {
    TaskrowClient::builder()
        .service_url(TENANT)
        .access_key(mock_server::ACCESS_KEY)
        .transport(loopback(addr))
        .build()
        .unwrap()
}

#[test]
fn access_key_lifecycle() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (addr, _state) = start_mock();
    let client = key_client(addr);
    assert!(!client.is_session());

    // Step 1: who am I.
    let index = client.index_data(None).unwrap();
    assert_eq!(index.user_id, 7);
    assert_eq!(index.company_name.as_deref(), Some("Acme Studio"));
    assert_eq!(index.pipelines[0].steps.len(), 2);

    // Step 2: users come back sorted with inverted flags.
    let users = client.list_users(None).unwrap();
    let ids: Vec<u32> = users.iter().map(|u| u.user_id).collect();
    assert_eq!(ids, vec![3, 7, 9]);
    assert!(!users[0].active);
    assert_eq!(users[1].photo_url(), "g7h.jpg");

    let ivy = client.get_user_by_email("IVY@acme.com", None).unwrap().unwrap();
    assert_eq!(ivy.user_id, 9);
    assert!(client.get_user_by_email("nobody@acme.com", None).unwrap().is_none());

    // Step 3: user detail with loose fields.
    let gina = client.get_user(7, None).unwrap();
    assert_eq!(gina.extension, Some(2201));
    assert_eq!(gina.registration_number.as_deref(), Some("700"));
    assert!(gina.billable);
    assert!(gina.requires_timesheet);
    assert_eq!(gina.office.unwrap().name, "Sao Paulo");

    let carl = client.get_user(3, None).unwrap();
    assert!(!carl.active);
    assert!(!carl.requires_timesheet);
    assert_eq!(carl.extension, None);

    // Step 4: groups and the group dashboard.
    let groups = client.list_groups(None).unwrap();
    assert_eq!(groups[0].group_id, mock_server::GROUP_ID);

    let tasks = client.list_tasks_by_group(groups[0].group_id, None, None).unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].situation, TaskSituation::Open);
    assert_eq!(tasks[2].situation, TaskSituation::Closed);
    assert_eq!(tasks[2].owner_user_id, None);

    let mine = client.list_tasks_by_group(groups[0].group_id, Some(9), None).unwrap();
    assert_eq!(mine.len(), 1);

    // Step 5: task detail, including the nested sub-task.
    let detail = client.get_task_detail(&mine[0].reference(), None).unwrap();
    assert_eq!(detail.task_id, 9001);
    assert_eq!(detail.job_title, "Spring launch");
    assert_eq!(detail.tags.len(), 2);
    assert_eq!(detail.last_forward_user.as_ref().unwrap().user_id, 9);
    let child = detail.sub_tasks[0].child_task.as_ref().unwrap();
    assert_eq!(child.task_number, 13);
    assert_eq!(child.client_nickname, "acme");

    // Step 6: forward the task back to Gina.
    let due = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let request = SaveTaskRequest::for_task(&detail, "your turn", 7, due);
    let saved = client.save_task(&request, None).unwrap();
    assert!(saved.success, "{}", saved.message);
    let entity = saved.entity.unwrap();
    assert_eq!(entity.task_id, 9001);
    assert_ne!(entity.row_version, detail.row_version);

    // Step 7: the old row version is now rejected, and that is not an error.
    let stale = client.save_task(&request, None).unwrap();
    assert!(!stale.success);
    assert!(stale.entity.is_none());

    // Step 8: the forward shows up in the history.
    let after = client.get_task_detail(&detail.reference(), None).unwrap();
    assert_eq!(after.task_items.len(), 3);
    let last = after.task_items.last().unwrap();
    assert_eq!(last.old_owner_user_id, Some(9));
    assert_eq!(last.new_owner_user_id, Some(7));
    assert_eq!(last.comment, "your turn");
    assert_eq!(after.due_date.unwrap().date(), due);

    assert_eq!(client.keep_alive().unwrap(), "OK");
}

#[test]
fn session_login_lifecycle() {
    let (addr, _state) = start_mock();
    let client = TaskrowClient::builder()
        .service_url("https://ACME.taskrow.com/some/page")
        .credential(Credential::EmailAndPassword {
            email: mock_server::LOGIN_EMAIL.to_string(),
            password: mock_server::LOGIN_PASSWORD.to_string(),
        })
        .transport(loopback(addr))
        .build()
        .unwrap();

    assert!(client.is_session());
    assert_eq!(client.index_data(None).unwrap().user_login, "gina");
    assert_eq!(client.list_groups(None).unwrap().len(), 2);
}

#[test]
fn wrong_password_fails_build() {
    let (addr, state) = start_mock();
    let err = TaskrowClient::builder()
        .service_url(TENANT)
        .credential(Credential::EmailAndPassword {
            email: mock_server::LOGIN_EMAIL.to_string(),
            password: "wrong".to_string(),
        })
        .default_policy(RetryPolicy::new(3, 5).unwrap())
        .transport(loopback(addr))
        .build()
        .unwrap_err();

    assert!(matches!(err, TaskrowError::AuthenticationFailure { .. }), "{err:?}");
    assert_eq!(state.request_count(), 1);
}

#[test]
fn wrong_key_is_authentication_failure() {
    let (addr, state) = start_mock();
    let client = TaskrowClient::builder()
        .service_url(TENANT)
        .access_key("wrong-key-but-long-enough")
        .default_policy(RetryPolicy::new(3, 5).unwrap())
        .transport(loopback(addr))
        .build()
        .unwrap();

    let err = client.list_users(None).unwrap_err();
    assert!(matches!(err, TaskrowError::AuthenticationFailure { .. }), "{err:?}");
    assert!(!err.is_retryable());
    assert_eq!(state.request_count(), 1);
}

#[test]
fn unavailable_service_is_retried() {
    let (addr, state) = start_mock();
    let client = key_client(addr);
    state.fail_next(2);

    let groups = client.list_groups(RetryPolicy::new(3, 5).unwrap()).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(state.request_count(), 3);
}

#[test]
fn exhausted_attempts_report_operation_failure() {
    let (addr, state) = start_mock();
    let client = key_client(addr);
    state.fail_next(5);

    let err = client.list_groups(RetryPolicy::new(2, 5).unwrap()).unwrap_err();
    assert_eq!(err.attempts(), Some(2));
    let message = err.to_string();
    assert!(message.contains("after 2 attempt"), "{message}");
    assert!(message.contains("/Administrative/ListGroups"), "{message}");
    assert!(message.contains("timeout: 5 seconds"), "{message}");
    match err {
        TaskrowError::OperationFailed { source, .. } => {
            assert!(matches!(*source, TaskrowError::UnexpectedStatus { status: 503, .. }));
        }
        other => panic!("expected OperationFailed, got {other:?}"),
    }
    assert_eq!(state.request_count(), 2);
}

#[test]
fn slow_answer_times_out_then_retries() {
    let (addr, state) = start_mock();
    let client = key_client(addr);
    state.delay_next(1, Duration::from_millis(2500));

    let users = client.list_users(RetryPolicy::new(2, 1).unwrap()).unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(state.request_count(), 2);
}

#[test]
fn shared_transport_applies_each_request_deadline() {
    let (addr, state) = start_mock();
    let client = key_client(addr);
    state.delay_next(2, Duration::from_millis(1500));

    let err = client.list_users(RetryPolicy::new(1, 1).unwrap()).unwrap_err();
    assert_eq!(err.attempts(), Some(1), "{err:?}");

    // Same agent, longer deadline: the slow answer now arrives in time.
    let users = client.list_users(RetryPolicy::new(1, 5).unwrap()).unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(state.request_count(), 2);
}

#[test]
fn unknown_task_is_not_retried() {
    let (addr, state) = start_mock();
    let client = key_client(addr);

    let err = client
        .get_task_detail(&TaskReference::new("acme", 45, 999), RetryPolicy::new(3, 5).unwrap())
        .unwrap_err();
    assert!(matches!(err, TaskrowError::UnexpectedStatus { status: 404, .. }), "{err:?}");
    assert_eq!(state.request_count(), 1);
}

#[test]
fn closed_port_is_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = key_client(addr);
    let err = client.list_groups(None).unwrap_err();
    match err {
        TaskrowError::OperationFailed { attempts, source, .. } => {
            assert_eq!(attempts, 1);
            assert!(matches!(*source, TaskrowError::Transport { .. }), "{source:?}");
        }
        other => panic!("expected OperationFailed, got {other:?}"),
    }
}
