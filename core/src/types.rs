//! Public domain records.
//!
//! # Design
//! Every record is an immutable snapshot built by `mapper` from a wire
//! response. Field names follow Rust conventions rather than the service's
//! JSON, flags that the service sends in negative form are already inverted,
//! and values the service may omit are `Option`s.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

fn photo_url(hash_code: &str) -> String {
    format!("{hash_code}.jpg")
}

/// Summary row returned by the user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserHeader {
    pub user_id: u32,
    pub full_name: String,
    pub main_email: String,
    pub user_login: String,
    pub active: bool,
    pub app_main_company_id: u32,
    pub user_hash_code: String,
    pub approval_group: Option<String>,
    pub profile_title: Option<String>,
}

impl UserHeader {
    /// Avatar file name, derived from the hash code.
    pub fn photo_url(&self) -> String {
        photo_url(&self.user_hash_code)
    }
}

/// Full user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: u32,
    pub full_name: String,
    pub main_email: String,
    pub photo_version: u32,
    pub extension: Option<i64>,
    pub main_phone_number: Option<String>,
    pub main_cell_number: Option<String>,
    pub user_login: String,
    pub user_hash_code: String,
    pub app_main_company_id: u32,
    pub app_main_language_id: u32,
    pub active: bool,
    pub profile_id: u32,
    pub external_code: Option<String>,
    pub profile_title: Option<String>,
    pub user_function_title: Option<String>,
    pub billable: bool,
    pub requires_timesheet: bool,
    pub approval_group: Option<String>,
    pub external_user: bool,
    pub registration_number: Option<String>,
    pub office: Option<Office>,
}

impl User {
    pub fn photo_url(&self) -> String {
        photo_url(&self.user_hash_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Office {
    pub office_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub group_id: u32,
    pub group_name: String,
}

/// Which list of the group dashboard a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskSituation {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHeader {
    pub task_id: u32,
    pub task_number: u32,
    pub task_title: String,
    pub job_id: u32,
    pub job_number: u32,
    pub client_nickname: String,
    pub creation_date: NaiveDateTime,
    pub due_date: Option<NaiveDateTime>,
    pub owner_user_id: Option<u32>,
    pub situation: TaskSituation,
}

impl TaskHeader {
    /// Key for fetching this task's detail.
    pub fn reference(&self) -> TaskReference {
        TaskReference::new(self.client_nickname.clone(), self.job_number, self.task_number)
    }
}

/// Natural key of a task: client, job and task number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskReference {
    pub client_nickname: String,
    pub job_number: u32,
    pub task_number: u32,
}

impl TaskReference {
    pub fn new(client_nickname: impl Into<String>, job_number: u32, task_number: u32) -> Self {
        Self {
            client_nickname: client_nickname.into(),
            job_number,
            task_number,
        }
    }
}

/// A task with its history, tags and sub-tasks.
///
/// Sub-tasks may carry their own child `TaskDetail`, owned by the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDetail {
    pub task_id: u32,
    pub task_number: u32,
    pub task_title: String,
    pub member_list_string: String,
    pub row_version: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub job_id: u32,
    pub job_number: u32,
    pub job_title: String,
    pub client_nickname: String,
    pub task_items: Vec<TaskItem>,
    pub tags: Vec<TaskTag>,
    pub sub_tasks: Vec<SubTask>,
    pub last_forward_user: Option<ForwardUser>,
}

impl TaskDetail {
    pub fn reference(&self) -> TaskReference {
        TaskReference::new(self.client_nickname.clone(), self.job_number, self.task_number)
    }

    /// Id of the most recent history item, as `SaveTask` expects it.
    pub fn last_task_item_id(&self) -> Option<u32> {
        self.task_items.iter().map(|item| item.task_item_id).max()
    }
}

/// One forward/comment entry in a task's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskItem {
    pub task_item_id: u32,
    pub old_owner_user_id: Option<u32>,
    pub old_owner_name: Option<String>,
    pub new_owner_user_id: Option<u32>,
    pub new_owner_name: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTag {
    pub task_tag_id: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTask {
    pub subtask_id: u32,
    pub task_id: u32,
    pub child_task_id: u32,
    pub title: String,
    pub child_task: Option<Box<TaskDetail>>,
}

/// The user a task was last forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardUser {
    pub user_id: u32,
    pub user_login: String,
    pub user_hash_code: String,
    pub full_name: String,
    pub external_code: Option<String>,
    pub photo_version: u32,
    pub creator: bool,
}

impl ForwardUser {
    pub fn photo_url(&self) -> String {
        photo_url(&self.user_hash_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub pipeline_id: u32,
    pub name: String,
    pub description: Option<String>,
    pub company_default: bool,
    pub extranet: bool,
    pub reset_on_request_type_change: bool,
    pub steps: Vec<PipelineStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStep {
    pub pipeline_step_id: u32,
    pub name: String,
    pub sort_order: u32,
}

/// Snapshot of the signed-in user and company configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexData {
    pub user_id: u32,
    pub user_login: String,
    pub full_name: String,
    pub main_email: String,
    pub user_hash_code: String,
    pub app_main_company_id: u32,
    pub company_name: Option<String>,
    pub pipelines: Vec<Pipeline>,
}

/// Input for `TaskrowClient::save_task`: forwards a task with a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTaskRequest {
    pub client_nickname: String,
    pub job_number: u32,
    pub task_id: u32,
    pub task_number: u32,
    pub last_task_item_id: u32,
    pub member_list_string: String,
    pub row_version: Option<String>,
    pub task_title: String,
    pub task_item_comment: String,
    pub owner_user_id: u32,
    /// Minutes.
    pub spent_time: u32,
    pub due_date: NaiveDate,
    pub percent_complete: u8,
}

impl SaveTaskRequest {
    /// Start from an existing task, keeping its identity and concurrency token.
    pub fn for_task(detail: &TaskDetail, comment: impl Into<String>, owner_user_id: u32, due_date: NaiveDate) -> Self {
        Self {
            client_nickname: detail.client_nickname.clone(),
            job_number: detail.job_number,
            task_id: detail.task_id,
            task_number: detail.task_number,
            last_task_item_id: detail.last_task_item_id().unwrap_or_default(),
            member_list_string: detail.member_list_string.clone(),
            row_version: detail.row_version.clone(),
            task_title: detail.task_title.clone(),
            task_item_comment: comment.into(),
            owner_user_id,
            spent_time: 0,
            due_date,
            percent_complete: 0,
        }
    }
}

/// The service's answer to a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveTaskResponse {
    pub success: bool,
    pub message: String,
    pub entity: Option<SavedTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedTask {
    pub task_id: u32,
    pub task_number: u32,
    pub row_version: Option<String>,
}
