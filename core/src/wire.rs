//! Wire schema: serde structures that mirror the service's JSON field names.
//!
//! These are never exposed; `mapper` turns them into the public `types`.
//! Fields the service sends as "number, string or null" are kept as raw
//! `serde_json::Value` so the mapper decides how to read them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserListResponse {
    pub users: Vec<UserHeaderApi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserHeaderApi {
    #[serde(rename = "UserID")]
    pub user_id: u32,
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "MainEmail", default)]
    pub main_email: Option<String>,
    #[serde(rename = "UserLogin", default)]
    pub user_login: Option<String>,
    #[serde(rename = "Inactive", default)]
    pub inactive: bool,
    #[serde(rename = "AppMainCompanyID", default)]
    pub app_main_company_id: u32,
    #[serde(rename = "UserHashCode", default)]
    pub user_hash_code: Option<String>,
    #[serde(rename = "ApprovalGroup", default)]
    pub approval_group: Option<String>,
    #[serde(rename = "ProfileTitle", default)]
    pub profile_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserDetailResponse {
    pub entity: UserApi,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserApi {
    #[serde(rename = "UserID")]
    pub user_id: u32,
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "MainEmail", default)]
    pub main_email: Option<String>,
    #[serde(rename = "PhotoVersion", default)]
    pub photo_version: u32,
    #[serde(rename = "Extension", default)]
    pub extension: Value,
    #[serde(rename = "MainPhoneNumber", default)]
    pub main_phone_number: Option<String>,
    #[serde(rename = "MainCellNumber", default)]
    pub main_cell_number: Option<String>,
    #[serde(rename = "UserLogin", default)]
    pub user_login: Option<String>,
    #[serde(rename = "UserHashCode", default)]
    pub user_hash_code: Option<String>,
    #[serde(rename = "AppMainCompanyID", default)]
    pub app_main_company_id: u32,
    #[serde(rename = "AppMainLanguageID", default)]
    pub app_main_language_id: u32,
    #[serde(rename = "Inactive", default)]
    pub inactive: bool,
    #[serde(rename = "ProfileID", default)]
    pub profile_id: u32,
    #[serde(rename = "ExternalCode", default)]
    pub external_code: Value,
    #[serde(rename = "ProfileTitle", default)]
    pub profile_title: Option<String>,
    #[serde(rename = "UserFunctionTitle", default)]
    pub user_function_title: Option<String>,
    #[serde(rename = "NotBillable", default)]
    pub not_billable: bool,
    #[serde(rename = "NotRequiredTimesheet", default)]
    pub not_required_timesheet: bool,
    #[serde(rename = "ApprovalGroup", default)]
    pub approval_group: Option<String>,
    #[serde(rename = "ExternalUser", default)]
    pub external_user: bool,
    #[serde(rename = "RegistrationNumber", default)]
    pub registration_number: Value,
    #[serde(rename = "Office", default)]
    pub office: Option<OfficeApi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OfficeApi {
    #[serde(rename = "OfficeID")]
    pub office_id: u32,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GroupListResponse {
    pub groups: Vec<GroupApi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupApi {
    #[serde(rename = "GroupID")]
    pub group_id: u32,
    #[serde(rename = "GroupName")]
    pub group_name: String,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TasksByGroupResponse {
    pub entity: TasksByGroupEntity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TasksByGroupEntity {
    #[serde(default)]
    pub open_tasks: Option<Vec<TaskHeaderApi>>,
    #[serde(default)]
    pub closed_tasks: Option<Vec<TaskHeaderApi>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskHeaderApi {
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "TaskNumber")]
    pub task_number: u32,
    #[serde(rename = "TaskTitle")]
    pub task_title: String,
    #[serde(rename = "CreationDate")]
    pub creation_date: NaiveDateTime,
    #[serde(rename = "DueDate", default)]
    pub due_date: Option<NaiveDateTime>,
    #[serde(rename = "JobID")]
    pub job_id: u32,
    #[serde(rename = "JobNumber")]
    pub job_number: u32,
    #[serde(rename = "ClientNickName")]
    pub client_nickname: String,
    #[serde(rename = "OwnerUserID", default)]
    pub owner_user_id: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TaskDetailResponse {
    pub task_data: TaskDataApi,
    pub job_data: JobDataApi,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskDataApi {
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "TaskNumber")]
    pub task_number: u32,
    #[serde(rename = "TaskTitle")]
    pub task_title: String,
    #[serde(rename = "MemberListString", default)]
    pub member_list_string: Option<String>,
    #[serde(rename = "RowVersion", default)]
    pub row_version: Option<String>,
    #[serde(rename = "DueDate", default)]
    pub due_date: Option<NaiveDateTime>,
    #[serde(rename = "NewTaskItems", default)]
    pub task_items: Option<Vec<TaskItemApi>>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<Vec<TaskTagApi>>,
    #[serde(rename = "Subtasks", default)]
    pub subtasks: Option<Vec<SubtaskApi>>,
    #[serde(rename = "LastForwardUser", default)]
    pub last_forward_user: Option<LastForwardUserApi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskItemApi {
    #[serde(rename = "TaskItemID")]
    pub task_item_id: u32,
    #[serde(rename = "OldOwnerUserID", default)]
    pub old_owner_user_id: Value,
    #[serde(rename = "OldOwnerName", default)]
    pub old_owner_name: Option<String>,
    #[serde(rename = "NewOwnerUserID", default)]
    pub new_owner_user_id: Value,
    #[serde(rename = "NewOwnerName", default)]
    pub new_owner_name: Option<String>,
    #[serde(rename = "TaskItemComment", default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskTagApi {
    #[serde(rename = "TaskTagID")]
    pub task_tag_id: u32,
    #[serde(rename = "TagTitle")]
    pub tag_title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubtaskApi {
    #[serde(rename = "SubtaskID")]
    pub subtask_id: u32,
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "ChildTaskID")]
    pub child_task_id: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "ChildTask", default)]
    pub child_task: Option<Box<TaskDataApi>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LastForwardUserApi {
    #[serde(rename = "UserID")]
    pub user_id: u32,
    #[serde(rename = "UserLogin", default)]
    pub user_login: Option<String>,
    #[serde(rename = "UserHashCode", default)]
    pub user_hash_code: Option<String>,
    #[serde(rename = "FullName", default)]
    pub full_name: Option<String>,
    #[serde(rename = "ExternalCode", default)]
    pub external_code: Value,
    #[serde(rename = "PhotoVersion", default)]
    pub photo_version: u32,
    #[serde(rename = "Creator", default)]
    pub creator: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobDataApi {
    #[serde(rename = "JobID")]
    pub job_id: u32,
    #[serde(rename = "JobNumber")]
    pub job_number: u32,
    #[serde(rename = "JobTitle", default)]
    pub job_title: Option<String>,
    #[serde(rename = "Client")]
    pub client: ClientApi,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientApi {
    #[serde(rename = "ClientNickName")]
    pub client_nickname: String,
}

// ---------------------------------------------------------------------------
// Save task
// ---------------------------------------------------------------------------

/// Request body for `/Task/SaveTask`, keyed the way the service reads it.
#[derive(Debug, Serialize)]
pub(crate) struct SaveTaskApi<'a> {
    #[serde(rename = "jobNumber")]
    pub job_number: u32,
    #[serde(rename = "clientNickName")]
    pub client_nickname: &'a str,
    #[serde(rename = "lastTaskItemID")]
    pub last_task_item_id: u32,
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "TaskNumber")]
    pub task_number: u32,
    #[serde(rename = "MemberListString")]
    pub member_list_string: &'a str,
    #[serde(rename = "RowVersion", skip_serializing_if = "Option::is_none")]
    pub row_version: Option<&'a str>,
    #[serde(rename = "TaskTitle")]
    pub task_title: &'a str,
    #[serde(rename = "TaskItemComment")]
    pub task_item_comment: &'a str,
    #[serde(rename = "OwnerUserID")]
    pub owner_user_id: u32,
    #[serde(rename = "SpentTime")]
    pub spent_time: u32,
    #[serde(rename = "DueDate")]
    pub due_date: String,
    #[serde(rename = "PercentComplete")]
    pub percent_complete: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SaveTaskResponseApi {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub entity: Option<SavedTaskApi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SavedTaskApi {
    #[serde(rename = "TaskID")]
    pub task_id: u32,
    #[serde(rename = "TaskNumber")]
    pub task_number: u32,
    #[serde(rename = "RowVersion", default)]
    pub row_version: Option<String>,
}

// ---------------------------------------------------------------------------
// Index data
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct IndexDataApi {
    #[serde(rename = "UserID")]
    pub user_id: u32,
    #[serde(rename = "UserLogin", default)]
    pub user_login: Option<String>,
    #[serde(rename = "FullName", default)]
    pub full_name: Option<String>,
    #[serde(rename = "MainEmail", default)]
    pub main_email: Option<String>,
    #[serde(rename = "UserHashCode", default)]
    pub user_hash_code: Option<String>,
    #[serde(rename = "AppMainCompanyID", default)]
    pub app_main_company_id: u32,
    #[serde(rename = "CompanyName", default)]
    pub company_name: Option<String>,
    #[serde(rename = "Pipelines", default)]
    pub pipelines: Option<Vec<PipelineApi>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PipelineApi {
    #[serde(rename = "PipelineID")]
    pub pipeline_id: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "CompanyDefault", default)]
    pub company_default: bool,
    #[serde(rename = "Extranet", default)]
    pub extranet: bool,
    #[serde(rename = "ResetOnRequestTypeChange", default)]
    pub reset_on_request_type_change: bool,
    #[serde(rename = "PipelineSteps", default)]
    pub pipeline_steps: Option<Vec<PipelineStepApi>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PipelineStepApi {
    #[serde(rename = "PipelineStepID")]
    pub pipeline_step_id: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Order", default)]
    pub order: u32,
}
