//! In-process stand-in for a Taskrow tenant.
//!
//! # Design
//! - Answers the endpoints the client calls, with the service's own JSON
//!   field names. Response shapes are declared here independently of the
//!   client crate so integration tests catch schema drift.
//! - Requests must carry the access key header or a session cookie pair
//!   obtained from `POST /LoginPassword`.
//! - Tasks live in memory; `SaveTask` forwards a task, bumps its row version
//!   and rejects stale row versions the way the service does.
//! - `MockState::fail_next` and `MockState::delay_next` inject 503s and slow
//!   answers for retry tests.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const ACCESS_KEY: &str = "mock-access-key-0123456789";
pub const ACCESS_KEY_HEADER: &str = "__identifier";
pub const LOGIN_EMAIL: &str = "gina@acme.com";
pub const LOGIN_PASSWORD: &str = "s3cret";
pub const AUTH_TICKET: &str = "mock-ticket";
pub const AUTH_TICKET_VOL: &str = "mock-ticket-vol";

const AUTH_TICKET_SET_COOKIE: &str = "AUTHTICKET=mock-ticket; path=/; HttpOnly";
const AUTH_TICKET_VOL_SET_COOKIE: &str = "AUTHTICKETVOL=mock-ticket-vol; path=/; HttpOnly";

pub const GROUP_ID: u32 = 421;
pub const CLIENT_NICKNAME: &str = "acme";
pub const JOB_ID: u32 = 310;
pub const JOB_NUMBER: u32 = 45;
const JOB_TITLE: &str = "Spring launch";

struct UserRow {
    id: u32,
    name: &'static str,
    email: &'static str,
    login: &'static str,
    inactive: bool,
}

const USERS: [UserRow; 3] = [
    UserRow { id: 7, name: "Gina Ortiz", email: "gina@acme.com", login: "gina", inactive: false },
    UserRow { id: 3, name: "Carl Mendes", email: "carl@acme.com", login: "carl", inactive: true },
    UserRow { id: 9, name: "Ivy Park", email: "ivy@acme.com", login: "ivy", inactive: false },
];

fn user_name(id: u32) -> Option<String> {
    USERS.iter().find(|u| u.id == id).map(|u| u.name.to_string())
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(rename = "TaskItemID")]
    pub task_item_id: u32,
    #[serde(rename = "OldOwnerUserID")]
    pub old_owner_user_id: Option<u32>,
    #[serde(rename = "OldOwnerName")]
    pub old_owner_name: Option<String>,
    #[serde(rename = "NewOwnerUserID")]
    pub new_owner_user_id: Option<u32>,
    #[serde(rename = "NewOwnerName")]
    pub new_owner_name: Option<String>,
    #[serde(rename = "TaskItemComment")]
    pub task_item_comment: String,
}

/// Body of `POST /Task/SaveTask`.
#[derive(Debug, Deserialize)]
pub struct SaveTask {
    #[serde(rename = "jobNumber")]
    pub job_number: u32,
    #[serde(rename = "clientNickName")]
    pub client_nickname: String,
    #[serde(rename = "lastTaskItemID")]
    pub last_task_item_id: u32,
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "TaskNumber")]
    pub task_number: u32,
    #[serde(rename = "MemberListString", default)]
    pub member_list_string: String,
    #[serde(rename = "RowVersion", default)]
    pub row_version: Option<String>,
    #[serde(rename = "TaskTitle")]
    pub task_title: String,
    #[serde(rename = "TaskItemComment")]
    pub task_item_comment: String,
    #[serde(rename = "OwnerUserID")]
    pub owner_user_id: u32,
    #[serde(rename = "SpentTime", default)]
    pub spent_time: u32,
    #[serde(rename = "DueDate")]
    pub due_date: String,
    #[serde(rename = "PercentComplete", default)]
    pub percent_complete: u8,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveTaskResult {
    pub success: bool,
    pub message: String,
    pub entity: Option<SavedTask>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedTask {
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "TaskNumber")]
    pub task_number: u32,
    #[serde(rename = "RowVersion")]
    pub row_version: String,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct UserDetailQuery {
    #[serde(rename = "userID")]
    user_id: u32,
}

#[derive(Deserialize)]
struct TasksByGroupQuery {
    #[serde(rename = "groupID")]
    group_id: u32,
    #[serde(rename = "userID")]
    user_id: Option<u32>,
}

#[derive(Deserialize)]
struct TaskDetailQuery {
    #[serde(rename = "jobNumber")]
    job_number: u32,
    #[serde(rename = "taskNumber")]
    task_number: u32,
    #[serde(rename = "clientNickname")]
    client_nickname: String,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Task {
    task_id: u32,
    task_number: u32,
    title: String,
    members: String,
    row_version: u64,
    creation_date: &'static str,
    due_date: Option<String>,
    owner_user_id: Option<u32>,
    closed: bool,
    parent_task_id: Option<u32>,
    items: Vec<TaskItem>,
    tags: Vec<(u32, &'static str)>,
}

impl Task {
    fn row_version(&self) -> String {
        format!("RV{:08}", self.row_version)
    }

    fn header_json(&self) -> Value {
        json!({
            "TaskID": self.task_id,
            "TaskNumber": self.task_number,
            "TaskTitle": self.title,
            "CreationDate": self.creation_date,
            "DueDate": self.due_date,
            "JobID": JOB_ID,
            "JobNumber": JOB_NUMBER,
            "ClientNickName": CLIENT_NICKNAME,
            "OwnerUserID": self.owner_user_id,
        })
    }
}

fn seed_tasks() -> Vec<Task> {
    vec![
        Task {
            task_id: 9001,
            task_number: 12,
            title: "Draft launch copy".to_string(),
            members: "7,9".to_string(),
            row_version: 1,
            creation_date: "2024-05-02T10:15:00",
            due_date: Some("2024-05-20T00:00:00".to_string()),
            owner_user_id: Some(9),
            closed: false,
            parent_task_id: None,
            items: vec![
                TaskItem {
                    task_item_id: 501,
                    old_owner_user_id: None,
                    old_owner_name: None,
                    new_owner_user_id: Some(7),
                    new_owner_name: user_name(7),
                    task_item_comment: "Please draft".to_string(),
                },
                TaskItem {
                    task_item_id: 502,
                    old_owner_user_id: Some(7),
                    old_owner_name: user_name(7),
                    new_owner_user_id: Some(9),
                    new_owner_name: user_name(9),
                    task_item_comment: "Review".to_string(),
                },
            ],
            tags: vec![(1, "urgent"), (4, "copy")],
        },
        Task {
            task_id: 9002,
            task_number: 13,
            title: "Headline options".to_string(),
            members: "7".to_string(),
            row_version: 1,
            creation_date: "2024-05-03T08:00:00",
            due_date: None,
            owner_user_id: Some(7),
            closed: false,
            parent_task_id: Some(9001),
            items: Vec::new(),
            tags: Vec::new(),
        },
        Task {
            task_id: 8800,
            task_number: 3,
            title: "Kickoff meeting".to_string(),
            members: "7".to_string(),
            row_version: 4,
            creation_date: "2024-04-01T09:00:00",
            due_date: None,
            owner_user_id: None,
            closed: true,
            parent_task_id: None,
            items: Vec::new(),
            tags: Vec::new(),
        },
    ]
}

struct Shared {
    tasks: RwLock<Vec<Task>>,
    fail_next: AtomicU32,
    delay_next: AtomicU32,
    delay_millis: AtomicU64,
    requests: AtomicU32,
}

/// Shared handle to the mock tenant. Cloning shares the same data.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Shared>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                tasks: RwLock::new(seed_tasks()),
                fail_next: AtomicU32::new(0),
                delay_next: AtomicU32::new(0),
                delay_millis: AtomicU64::new(0),
                requests: AtomicU32::new(0),
            }),
        }
    }

    /// Answer the next `count` requests with 503.
    pub fn fail_next(&self, count: u32) {
        self.inner.fail_next.store(count, Ordering::SeqCst);
    }

    /// Hold the next `count` requests for `delay` before answering.
    pub fn delay_next(&self, count: u32, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.delay_millis.store(millis, Ordering::SeqCst);
        self.inner.delay_next.store(count, Ordering::SeqCst);
    }

    /// Requests received so far, failed ones included.
    pub fn request_count(&self) -> u32 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app(state: MockState) -> Router {
    let protected = Router::new()
        .route("/main/indexdata", get(index_data))
        .route("/main/keepalive", get(keep_alive))
        .route("/User/ListUsers", get(list_users))
        .route("/User/UserDetail", get(user_detail))
        .route("/Administrative/ListGroups", get(list_groups))
        .route("/Dashboard/TasksByGroup", get(tasks_by_group))
        .route("/Task/TaskDetail", get(task_detail))
        .route("/Task/SaveTask", post(save_task))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/LoginPassword", post(login))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), inject_faults))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn inject_faults(State(state): State<MockState>, request: Request, next: Next) -> Response {
    state.inner.requests.fetch_add(1, Ordering::SeqCst);
    if MockState::take(&state.inner.delay_next) {
        let millis = state.inner.delay_millis.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
    if MockState::take(&state.inner.fail_next) {
        tracing::debug!(uri = %request.uri(), "injecting 503");
        return (StatusCode::SERVICE_UNAVAILABLE, "service unavailable").into_response();
    }
    next.run(request).await
}

fn has_session(headers: &HeaderMap) -> bool {
    let mut ticket = false;
    let mut vol = false;
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else { continue };
        for pair in value.split(';') {
            match pair.trim().split_once('=') {
                Some(("AUTHTICKET", v)) => ticket |= v == AUTH_TICKET,
                Some(("AUTHTICKETVOL", v)) => vol |= v == AUTH_TICKET_VOL,
                _ => {}
            }
        }
    }
    ticket && vol
}

/// Valid key or session passes. A stale session is sent to the login page,
/// anything else gets 401.
async fn require_auth(request: Request, next: Next) -> Response {
    let headers = request.headers();
    let key_ok = headers
        .get(ACCESS_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == ACCESS_KEY);
    if key_ok || has_session(headers) {
        return next.run(request).await;
    }
    if headers.contains_key(header::COOKIE) {
        return (StatusCode::FOUND, [(header::LOCATION, "/Login")]).into_response();
    }
    StatusCode::UNAUTHORIZED.into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn login(Form(form): Form<LoginForm>) -> Response {
    if !(form.email.eq_ignore_ascii_case(LOGIN_EMAIL) && form.password == LOGIN_PASSWORD) {
        return Html("<html><body>Invalid email or password</body></html>").into_response();
    }
    let mut response = (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response();
    let headers = response.headers_mut();
    headers.append(header::SET_COOKIE, HeaderValue::from_static(AUTH_TICKET_SET_COOKIE));
    headers.append(header::SET_COOKIE, HeaderValue::from_static(AUTH_TICKET_VOL_SET_COOKIE));
    response
}

async fn keep_alive() -> &'static str {
    "OK"
}

async fn index_data() -> Json<Value> {
    Json(json!({
        "UserID": 7,
        "UserLogin": "gina",
        "FullName": "Gina Ortiz",
        "MainEmail": "gina@acme.com",
        "UserHashCode": "g7h",
        "AppMainCompanyID": 1,
        "CompanyName": "Acme Studio",
        "Pipelines": [{
            "PipelineID": 2,
            "Name": "Creative",
            "Description": null,
            "CompanyDefault": true,
            "Extranet": false,
            "ResetOnRequestTypeChange": true,
            "PipelineSteps": [
                { "PipelineStepID": 20, "Name": "Briefing", "Order": 1 },
                { "PipelineStepID": 21, "Name": "Production", "Order": 2 }
            ]
        }]
    }))
}

async fn list_users() -> Json<Value> {
    let users: Vec<Value> = USERS
        .iter()
        .map(|u| {
            json!({
                "UserID": u.id,
                "FullName": u.name,
                "MainEmail": u.email,
                "UserLogin": u.login,
                "Inactive": u.inactive,
                "AppMainCompanyID": 1,
                "UserHashCode": format!("{}{}h", &u.login[..1], u.id),
                "ApprovalGroup": null,
                "ProfileTitle": null,
            })
        })
        .collect();
    Json(json!({ "Users": users }))
}

async fn user_detail(Query(query): Query<UserDetailQuery>) -> Result<Json<Value>, StatusCode> {
    let user = USERS
        .iter()
        .find(|u| u.id == query.user_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    // The service sends extensions as text for some tenants.
    let extension = if user.id == 7 { json!("2201") } else { Value::Null };
    Ok(Json(json!({
        "Entity": {
            "UserID": user.id,
            "FullName": user.name,
            "MainEmail": user.email,
            "PhotoVersion": 1,
            "Extension": extension,
            "MainPhoneNumber": null,
            "MainCellNumber": null,
            "UserLogin": user.login,
            "UserHashCode": format!("{}{}h", &user.login[..1], user.id),
            "AppMainCompanyID": 1,
            "AppMainLanguageID": 2,
            "Inactive": user.inactive,
            "ProfileID": 8,
            "ExternalCode": null,
            "ProfileTitle": null,
            "UserFunctionTitle": null,
            "NotBillable": false,
            "NotRequiredTimesheet": user.inactive,
            "ApprovalGroup": null,
            "ExternalUser": false,
            "RegistrationNumber": user.id * 100,
            "Office": { "OfficeID": 2, "Name": "Sao Paulo" }
        }
    })))
}

async fn list_groups() -> Json<Value> {
    Json(json!({
        "Groups": [
            { "GroupID": GROUP_ID, "GroupName": "Creative" },
            { "GroupID": 17, "GroupName": "Media" }
        ]
    }))
}

async fn tasks_by_group(
    State(state): State<MockState>,
    Query(query): Query<TasksByGroupQuery>,
) -> Json<Value> {
    let tasks = state.inner.tasks.read().await;
    let visible = |closed: bool| -> Vec<Value> {
        tasks
            .iter()
            .filter(|t| query.group_id == GROUP_ID && t.closed == closed)
            .filter(|t| query.user_id.is_none() || t.owner_user_id == query.user_id)
            .map(Task::header_json)
            .collect()
    };
    Json(json!({
        "Entity": {
            "OpenTasks": visible(false),
            "ClosedTasks": visible(true),
        }
    }))
}

fn task_data_json(tasks: &[Task], task: &Task) -> Value {
    let subtasks: Vec<Value> = tasks
        .iter()
        .filter(|child| child.parent_task_id == Some(task.task_id))
        .map(|child| {
            json!({
                "SubtaskID": child.task_id * 10,
                "TaskID": task.task_id,
                "ChildTaskID": child.task_id,
                "Title": child.title,
                "ChildTask": task_data_json(tasks, child),
            })
        })
        .collect();
    let last_forward = task
        .items
        .last()
        .and_then(|item| item.new_owner_user_id)
        .and_then(|id| USERS.iter().find(|u| u.id == id))
        .map(|u| {
            json!({
                "UserID": u.id,
                "UserLogin": u.login,
                "UserHashCode": format!("{}{}h", &u.login[..1], u.id),
                "FullName": u.name,
                "ExternalCode": null,
                "PhotoVersion": 1,
                "Creator": false,
            })
        });
    let tags: Vec<Value> = task
        .tags
        .iter()
        .map(|(id, title)| json!({ "TaskTagID": id, "TagTitle": title }))
        .collect();

    json!({
        "TaskID": task.task_id,
        "TaskNumber": task.task_number,
        "TaskTitle": task.title,
        "MemberListString": task.members,
        "RowVersion": task.row_version(),
        "DueDate": task.due_date,
        "NewTaskItems": task.items,
        "Tags": tags,
        "Subtasks": subtasks,
        "LastForwardUser": last_forward,
    })
}

async fn task_detail(
    State(state): State<MockState>,
    Query(query): Query<TaskDetailQuery>,
) -> Result<Json<Value>, StatusCode> {
    if query.job_number != JOB_NUMBER || !query.client_nickname.eq_ignore_ascii_case(CLIENT_NICKNAME) {
        return Err(StatusCode::NOT_FOUND);
    }
    let tasks = state.inner.tasks.read().await;
    let task = tasks
        .iter()
        .find(|t| t.task_number == query.task_number)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "TaskData": task_data_json(&tasks, task),
        "JobData": {
            "JobID": JOB_ID,
            "JobNumber": JOB_NUMBER,
            "JobTitle": JOB_TITLE,
            "Client": { "ClientNickName": CLIENT_NICKNAME }
        }
    })))
}

fn rejected(message: &str) -> Json<SaveTaskResult> {
    Json(SaveTaskResult {
        success: false,
        message: message.to_string(),
        entity: None,
    })
}

async fn save_task(State(state): State<MockState>, Json(input): Json<SaveTask>) -> Json<SaveTaskResult> {
    if input.job_number != JOB_NUMBER || !input.client_nickname.eq_ignore_ascii_case(CLIENT_NICKNAME) {
        return rejected("Job not found");
    }
    let mut tasks = state.inner.tasks.write().await;
    let Some(task) = tasks
        .iter_mut()
        .find(|t| t.task_id == input.task_id && t.task_number == input.task_number)
    else {
        return rejected("Task not found");
    };
    if input.row_version.as_deref().is_some_and(|v| v != task.row_version()) {
        return rejected("Task was changed by another user");
    }

    let next_item_id = task
        .items
        .iter()
        .map(|i| i.task_item_id)
        .max()
        .unwrap_or(input.last_task_item_id)
        + 1;
    task.items.push(TaskItem {
        task_item_id: next_item_id,
        old_owner_user_id: task.owner_user_id,
        old_owner_name: task.owner_user_id.and_then(user_name),
        new_owner_user_id: Some(input.owner_user_id),
        new_owner_name: user_name(input.owner_user_id),
        task_item_comment: input.task_item_comment,
    });
    task.title = input.task_title;
    task.members = input.member_list_string;
    task.owner_user_id = Some(input.owner_user_id);
    task.due_date = Some(format!("{}T00:00:00", input.due_date));
    task.closed = input.percent_complete >= 100;
    task.row_version += 1;
    tracing::debug!(task_id = task.task_id, spent = input.spent_time, "task saved");

    Json(SaveTaskResult {
        success: true,
        message: String::new(),
        entity: Some(SavedTask {
            task_id: task.task_id,
            task_number: task.task_number,
            row_version: task.row_version(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_task_body_reads_client_keys() {
        let input: SaveTask = serde_json::from_str(
            r#"{"jobNumber":45,"clientNickName":"acme","lastTaskItemID":502,"TaskID":9001,"TaskNumber":12,
                "MemberListString":"7,9","TaskTitle":"t","TaskItemComment":"c","OwnerUserID":7,
                "SpentTime":0,"DueDate":"2024-06-01","PercentComplete":0}"#,
        )
        .unwrap();
        assert_eq!(input.task_id, 9001);
        assert!(input.row_version.is_none());
        assert_eq!(input.due_date, "2024-06-01");
    }

    #[test]
    fn session_needs_both_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("AUTHTICKET=mock-ticket"));
        assert!(!has_session(&headers));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("AUTHTICKET=mock-ticket; AUTHTICKETVOL=mock-ticket-vol"),
        );
        assert!(has_session(&headers));
    }

    #[test]
    fn fault_counter_stops_at_zero() {
        let state = MockState::new();
        state.fail_next(2);
        assert!(MockState::take(&state.inner.fail_next));
        assert!(MockState::take(&state.inner.fail_next));
        assert!(!MockState::take(&state.inner.fail_next));
    }

    #[test]
    fn row_version_is_opaque_text() {
        let tasks = seed_tasks();
        assert_eq!(tasks[0].row_version(), "RV00000001");
        let json = task_data_json(&tasks, &tasks[0]);
        assert_eq!(json["Subtasks"][0]["ChildTask"]["TaskID"], 9002);
        assert_eq!(json["LastForwardUser"]["UserID"], 9);
    }
}
