//! The Taskrow client: one method per service endpoint.
//!
//! # Design
//! `ClientBuilder` holds unvalidated construction parameters. `build`
//! validates the address and credential, logs in when the credential is the
//! legacy email/password pair, and only then returns a `TaskrowClient`.
//! A built client never changes: it is cheap to clone and safe to share
//! across threads.
//!
//! Every operation validates its own arguments, resolves the retry policy
//! (argument, else client default, else 1 attempt / 120 s), and hands a
//! request plus a mapping closure to the `RequestExecutor`.

use std::sync::Arc;

use tracing::info;

use crate::config::ClientConfig;
use crate::connection::{Credential, ServiceAddress};
use crate::error::{Result, TaskrowError};
use crate::executor::{check_status, Authentication, RequestExecutor};
use crate::http::{HttpRequest, Transport, UreqTransport};
use crate::mapper;
use crate::retry::RetryPolicy;
use crate::session;
use crate::types::{
    Group, IndexData, SaveTaskRequest, SaveTaskResponse, TaskDetail, TaskHeader, TaskReference, User,
    UserHeader,
};

/// Keep-alive pings use a short fixed budget.
const KEEP_ALIVE_TIMEOUT_SECONDS: u64 = 5;

/// Unvalidated client parameters.
#[derive(Default)]
pub struct ClientBuilder {
    service_url: Option<String>,
    credential: Option<Credential>,
    default_policy: Option<RetryPolicy>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn access_key(self, key: impl Into<String>) -> Self {
        self.credential(Credential::access_key(key))
    }

    /// Policy used by operations that do not pass their own.
    pub fn default_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = Some(policy);
        self
    }

    /// Replace the HTTPS transport, e.g. with a test double.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the parameters and produce a ready client.
    ///
    /// An access-key client makes no network call here. An email/password
    /// client logs in first and fails if the service does not issue a session.
    pub fn build(self) -> Result<TaskrowClient> {
        let address = ServiceAddress::parse(self.service_url.as_deref())?;
        let credential = self
            .credential
            .ok_or_else(|| TaskrowError::InvalidCredential("credential is required".to_string()))?;
        credential.validate()?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));

        let executor = match credential {
            Credential::AccessKey(key) => RequestExecutor::new(transport, Authentication::AccessKey(key)),
            Credential::EmailAndPassword { email, password } => {
                let anonymous = RequestExecutor::new(transport, Authentication::Anonymous);
                let policy = RetryPolicy::resolve(None, self.default_policy);
                let cookies = session::login(&anonymous, &address, &email, &password, policy)?;
                anonymous.with_authentication(Authentication::Session(cookies))
            }
        };

        info!(host = address.host(), auth = ?executor.authentication(), "taskrow client ready");

        Ok(TaskrowClient {
            inner: Arc::new(Inner {
                address,
                executor,
                default_policy: self.default_policy,
            }),
        })
    }
}

#[derive(Debug)]
struct Inner {
    address: ServiceAddress,
    executor: RequestExecutor,
    default_policy: Option<RetryPolicy>,
}

/// A validated, authenticated Taskrow client.
#[derive(Debug, Clone)]
pub struct TaskrowClient {
    inner: Arc<Inner>,
}

impl TaskrowClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Access-key client with no default policy.
    pub fn connect(service_url: &str, access_key: &str) -> Result<Self> {
        Self::builder()
            .service_url(service_url)
            .access_key(access_key)
            .build()
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::builder()
            .service_url(config.service_url.as_str())
            .access_key(config.access_key.as_str())
            .default_policy(config.retry_policy()?)
            .build()
    }

    pub fn service_address(&self) -> &ServiceAddress {
        &self.inner.address
    }

    pub fn default_policy(&self) -> Option<RetryPolicy> {
        self.inner.default_policy
    }

    /// Whether this client authenticates with legacy session cookies.
    pub fn is_session(&self) -> bool {
        matches!(self.inner.executor.authentication(), Authentication::Session(_))
    }

    fn policy(&self, operation: Option<RetryPolicy>) -> RetryPolicy {
        RetryPolicy::resolve(operation, self.inner.default_policy)
    }

    fn url(&self, path_and_query: &str) -> Result<String> {
        Ok(self.inner.address.endpoint(path_and_query)?.to_string())
    }

    fn get<T>(
        &self,
        operation: &'static str,
        url: String,
        policy: RetryPolicy,
        map: fn(&str, &str) -> Result<T>,
    ) -> Result<T> {
        self.inner
            .executor
            .execute(operation, HttpRequest::get(url.as_str()), policy, |response| {
                let response = check_status(&url, response)?;
                map(&url, &response.body)
            })
    }

    /// Signed-in user and company snapshot.
    pub fn index_data(&self, policy: impl Into<Option<RetryPolicy>>) -> Result<IndexData> {
        let url = self.url("/main/indexdata")?;
        self.get("index data", url, self.policy(policy.into()), mapper::map_index_data)
    }

    /// All users, inactive included, ordered by id.
    pub fn list_users(&self, policy: impl Into<Option<RetryPolicy>>) -> Result<Vec<UserHeader>> {
        let url = self.url("/User/ListUsers?showInactive=true")?;
        self.get("list users", url, self.policy(policy.into()), mapper::map_user_list)
    }

    pub fn get_user(&self, user_id: u32, policy: impl Into<Option<RetryPolicy>>) -> Result<User> {
        if user_id == 0 {
            return Err(TaskrowError::invalid_argument("userID", "must not be zero"));
        }
        let url = self.url(&format!("/User/UserDetail?userID={user_id}"))?;
        self.get("get user", url, self.policy(policy.into()), mapper::map_user)
    }

    /// First user whose main email matches, ignoring case.
    pub fn get_user_by_email(
        &self,
        email: &str,
        policy: impl Into<Option<RetryPolicy>>,
    ) -> Result<Option<UserHeader>> {
        let email = email.trim();
        if email.is_empty() {
            return Err(TaskrowError::invalid_argument("email", "must not be empty"));
        }
        let needle = email.to_lowercase();
        let users = self.list_users(policy)?;
        Ok(users
            .into_iter()
            .find(|user| user.main_email.to_lowercase() == needle))
    }

    pub fn list_groups(&self, policy: impl Into<Option<RetryPolicy>>) -> Result<Vec<Group>> {
        let url = self.url("/Administrative/ListGroups?groupTypeID=2")?;
        self.get("list groups", url, self.policy(policy.into()), mapper::map_groups)
    }

    /// Open and recently closed tasks of a group, optionally for one user.
    pub fn list_tasks_by_group(
        &self,
        group_id: u32,
        user_id: Option<u32>,
        policy: impl Into<Option<RetryPolicy>>,
    ) -> Result<Vec<TaskHeader>> {
        if group_id == 0 {
            return Err(TaskrowError::invalid_argument("groupID", "must not be zero"));
        }
        let mut path = format!(
            "/Dashboard/TasksByGroup?groupID={group_id}&hierarchyEnabled=true&closedDays=20&context=1"
        );
        match user_id {
            Some(0) => return Err(TaskrowError::invalid_argument("userID", "must not be zero")),
            Some(user_id) => path.push_str(&format!("&userID={user_id}")),
            None => {}
        }
        let url = self.url(&path)?;
        self.get("list tasks by group", url, self.policy(policy.into()), mapper::map_tasks_by_group)
    }

    pub fn get_task_detail(
        &self,
        reference: &TaskReference,
        policy: impl Into<Option<RetryPolicy>>,
    ) -> Result<TaskDetail> {
        if reference.job_number == 0 {
            return Err(TaskrowError::invalid_argument("jobNumber", "must not be zero"));
        }
        if reference.task_number == 0 {
            return Err(TaskrowError::invalid_argument("taskNumber", "must not be zero"));
        }
        if reference.client_nickname.trim().is_empty() {
            return Err(TaskrowError::invalid_argument("clientNickname", "must not be empty"));
        }

        let mut url = self.inner.address.endpoint("/Task/TaskDetail")?;
        url.query_pairs_mut()
            .append_pair("jobNumber", &reference.job_number.to_string())
            .append_pair("taskNumber", &reference.task_number.to_string())
            .append_pair("clientNickname", reference.client_nickname.trim());
        self.get("get task detail", url.to_string(), self.policy(policy.into()), mapper::map_task_detail)
    }

    /// Post a task update. A `success: false` answer is returned, not raised.
    pub fn save_task(
        &self,
        request: &SaveTaskRequest,
        policy: impl Into<Option<RetryPolicy>>,
    ) -> Result<SaveTaskResponse> {
        if request.job_number == 0 {
            return Err(TaskrowError::invalid_argument("jobNumber", "must not be zero"));
        }
        if request.task_number == 0 {
            return Err(TaskrowError::invalid_argument("taskNumber", "must not be zero"));
        }
        if request.client_nickname.trim().is_empty() {
            return Err(TaskrowError::invalid_argument("clientNickName", "must not be empty"));
        }

        let url = self.url("/Task/SaveTask")?;
        let body = mapper::save_task_body(request)?;
        self.inner.executor.execute(
            "save task",
            HttpRequest::post_json(url.as_str(), body),
            self.policy(policy.into()),
            |response| {
                let response = check_status(&url, response)?;
                mapper::map_save_task_response(&url, &response.body)
            },
        )
    }

    /// Ping the service to keep a session warm; returns the raw body.
    pub fn keep_alive(&self) -> Result<String> {
        let url = self.url("/main/keepalive")?;
        let policy = RetryPolicy::new(1, KEEP_ALIVE_TIMEOUT_SECONDS)?;
        self.inner
            .executor
            .execute("keep alive", HttpRequest::get(url.as_str()), policy, |response| {
                check_status(&url, response).map(|r| r.body)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpResponse;

    const KEY: &str = "0123456789abcdefghij";

    /// Counts calls and answers every request with the same canned body.
    struct CannedTransport {
        body: &'static str,
        calls: AtomicUsize,
        last_url: std::sync::Mutex<Option<String>>,
    }

    impl CannedTransport {
        fn new(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
                last_url: std::sync::Mutex::new(None),
            })
        }
    }

    impl Transport for CannedTransport {
        fn send(&self, request: &HttpRequest, _timeout: Duration) -> std::result::Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(request.url.clone());
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: self.body.to_string(),
            })
        }
    }

    fn client(transport: Arc<CannedTransport>) -> TaskrowClient {
        TaskrowClient::builder()
            .service_url("https://acme.taskrow.com")
            .access_key(KEY)
            .transport(transport)
            .build()
            .unwrap()
    }

    #[test]
    fn build_rejects_bad_address_before_any_call() {
        let transport = CannedTransport::new("{}");
        for url in ["http://acme.taskrow.com", "https://example.com"] {
            let err = TaskrowClient::builder()
                .service_url(url)
                .access_key(KEY)
                .transport(transport.clone())
                .build()
                .unwrap_err();
            assert!(matches!(err, TaskrowError::InvalidAddress(_)), "{url}");
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn build_rejects_short_or_missing_key() {
        let err = TaskrowClient::connect("https://acme.taskrow.com", "short").unwrap_err();
        assert!(matches!(err, TaskrowError::InvalidCredential(_)));
        let err = TaskrowClient::builder()
            .service_url("https://acme.taskrow.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskrowError::InvalidCredential(_)));
    }

    #[test]
    fn zero_ids_fail_without_network() {
        let transport = CannedTransport::new("{}");
        let client = client(transport.clone());

        assert!(matches!(
            client.get_user(0, None),
            Err(TaskrowError::InvalidArgument { name: "userID", .. })
        ));
        assert!(matches!(
            client.list_tasks_by_group(0, None, None),
            Err(TaskrowError::InvalidArgument { name: "groupID", .. })
        ));
        assert!(matches!(
            client.list_tasks_by_group(4, Some(0), None),
            Err(TaskrowError::InvalidArgument { name: "userID", .. })
        ));
        assert!(matches!(
            client.get_task_detail(&TaskReference::new("acme", 0, 1), None),
            Err(TaskrowError::InvalidArgument { name: "jobNumber", .. })
        ));
        assert!(matches!(
            client.get_task_detail(&TaskReference::new(" ", 1, 1), None),
            Err(TaskrowError::InvalidArgument { name: "clientNickname", .. })
        ));
        assert!(matches!(
            client.get_user_by_email("  ", None),
            Err(TaskrowError::InvalidArgument { name: "email", .. })
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tasks_by_group_url_includes_optional_user() {
        let transport = CannedTransport::new(r#"{"Entity":{}}"#);
        let client = client(transport.clone());

        client.list_tasks_by_group(421, Some(3564), None).unwrap();
        assert_eq!(
            transport.last_url.lock().unwrap().as_deref(),
            Some("https://acme.taskrow.com/Dashboard/TasksByGroup?groupID=421&hierarchyEnabled=true&closedDays=20&context=1&userID=3564")
        );

        client.list_tasks_by_group(421, None, None).unwrap();
        assert!(!transport.last_url.lock().unwrap().as_deref().unwrap().contains("userID"));
    }

    #[test]
    fn task_detail_url_encodes_nickname() {
        let transport = CannedTransport::new("not json");
        let client = client(transport.clone());
        let _ = client.get_task_detail(&TaskReference::new("acme & co", 12, 3), None);
        assert_eq!(
            transport.last_url.lock().unwrap().as_deref(),
            Some("https://acme.taskrow.com/Task/TaskDetail?jobNumber=12&taskNumber=3&clientNickname=acme+%26+co")
        );
    }

    #[test]
    fn client_default_policy_applies() {
        let transport = CannedTransport::new("not json");
        let client = TaskrowClient::builder()
            .service_url("https://acme.taskrow.com")
            .access_key(KEY)
            .default_policy(RetryPolicy::new(3, 10).unwrap())
            .transport(transport.clone())
            .build()
            .unwrap();

        let err = client.list_groups(None).unwrap_err();
        assert_eq!(err.attempts(), Some(3));

        let err = client.list_groups(RetryPolicy::new(2, 10).unwrap()).unwrap_err();
        assert_eq!(err.attempts(), Some(2));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn get_user_by_email_ignores_case() {
        let transport = CannedTransport::new(
            r#"{"Users":[{"UserID":2,"FullName":"Bo","MainEmail":"bo@acme.com"},{"UserID":1,"FullName":"Ana","MainEmail":"Ana@Acme.com"}]}"#,
        );
        let client = client(transport);
        let user = client.get_user_by_email("ana@ACME.com", None).unwrap().unwrap();
        assert_eq!(user.user_id, 1);
        assert!(client.get_user_by_email("nobody@acme.com", None).unwrap().is_none());
    }

    #[test]
    fn get_user_by_email_folds_accented_letters() {
        let transport = CannedTransport::new(
            r#"{"Users":[{"UserID":4,"FullName":"Élodie","MainEmail":"Élodie@Acme.com"}]}"#,
        );
        let client = client(transport);
        let user = client.get_user_by_email("élodie@acme.com", None).unwrap().unwrap();
        assert_eq!(user.user_id, 4);
        assert!(client.get_user_by_email("elodie@acme.com", None).unwrap().is_none());
    }

    #[test]
    fn client_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TaskrowClient>();
    }
}
