//! Wire schema to domain mapping.
//!
//! # Design
//! Each `map_*` function parses a raw body into its `wire` structure and then
//! builds the public record field by field. Parse errors and loosely typed
//! fields holding something unreadable become `MalformedResponse` carrying
//! the endpoint. Retrying is the executor's business, not the mapper's.
//!
//! Normalization rules:
//! - negative wire flags (`Inactive`, `NotBillable`, `NotRequiredTimesheet`)
//!   are inverted;
//! - number-or-null fields become `Option`, never a zero sentinel;
//! - absent collections become empty, present ones keep their order;
//! - sub-task children are mapped recursively with the parent's job data.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, TaskrowError};
use crate::types::{
    ForwardUser, Group, IndexData, Office, Pipeline, PipelineStep, SaveTaskRequest, SaveTaskResponse,
    SavedTask, SubTask, TaskDetail, TaskHeader, TaskItem, TaskSituation, TaskTag, User, UserHeader,
};
use crate::wire::{
    GroupListResponse, IndexDataApi, JobDataApi, LastForwardUserApi, SaveTaskApi, SaveTaskResponseApi,
    TaskDataApi, TaskDetailResponse, TaskHeaderApi, TasksByGroupResponse, UserDetailResponse,
    UserListResponse,
};

/// Deserialize `body` or fail with `MalformedResponse` for `url`.
pub fn parse_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| TaskrowError::malformed(url, e.to_string()))
}

/// Read a number-or-null field. Numeric strings are accepted.
fn optional_i64(url: &str, field: &str, value: &Value) -> Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| TaskrowError::malformed(url, format!("{field}: {n} is not an integer"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| TaskrowError::malformed(url, format!("{field}: {s:?} is not a number"))),
        other => Err(TaskrowError::malformed(
            url,
            format!("{field}: expected number or null, got {other}"),
        )),
    }
}

fn optional_id(url: &str, field: &str, value: &Value) -> Result<Option<u32>> {
    optional_i64(url, field, value)?
        .map(|n| {
            u32::try_from(n)
                .map_err(|_| TaskrowError::malformed(url, format!("{field}: {n} is not a valid id")))
        })
        .transpose()
}

/// Read a string-or-number-or-null field as text.
fn optional_text(url: &str, field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(TaskrowError::malformed(
            url,
            format!("{field}: expected text, number or null, got {other}"),
        )),
    }
}

/// Users ordered by ascending id.
pub fn map_user_list(url: &str, body: &str) -> Result<Vec<UserHeader>> {
    let response: UserListResponse = parse_json(url, body)?;
    let mut users: Vec<UserHeader> = response
        .users
        .into_iter()
        .map(|api| UserHeader {
            user_id: api.user_id,
            full_name: api.full_name,
            main_email: api.main_email.unwrap_or_default(),
            user_login: api.user_login.unwrap_or_default(),
            active: !api.inactive,
            app_main_company_id: api.app_main_company_id,
            user_hash_code: api.user_hash_code.unwrap_or_default(),
            approval_group: api.approval_group,
            profile_title: api.profile_title,
        })
        .collect();
    users.sort_by_key(|user| user.user_id);
    Ok(users)
}

pub fn map_user(url: &str, body: &str) -> Result<User> {
    let response: UserDetailResponse = parse_json(url, body)?;
    let api = response.entity;
    Ok(User {
        user_id: api.user_id,
        full_name: api.full_name,
        main_email: api.main_email.unwrap_or_default(),
        photo_version: api.photo_version,
        extension: optional_i64(url, "Extension", &api.extension)?,
        main_phone_number: api.main_phone_number,
        main_cell_number: api.main_cell_number,
        user_login: api.user_login.unwrap_or_default(),
        user_hash_code: api.user_hash_code.unwrap_or_default(),
        app_main_company_id: api.app_main_company_id,
        app_main_language_id: api.app_main_language_id,
        active: !api.inactive,
        profile_id: api.profile_id,
        external_code: optional_text(url, "ExternalCode", &api.external_code)?,
        profile_title: api.profile_title,
        user_function_title: api.user_function_title,
        billable: !api.not_billable,
        requires_timesheet: !api.not_required_timesheet,
        approval_group: api.approval_group,
        external_user: api.external_user,
        registration_number: optional_text(url, "RegistrationNumber", &api.registration_number)?,
        office: api.office.map(|office| Office {
            office_id: office.office_id,
            name: office.name.unwrap_or_default(),
        }),
    })
}

pub fn map_groups(url: &str, body: &str) -> Result<Vec<Group>> {
    let response: GroupListResponse = parse_json(url, body)?;
    Ok(response
        .groups
        .into_iter()
        .map(|api| Group {
            group_id: api.group_id,
            group_name: api.group_name,
        })
        .collect())
}

/// Open tasks first, then closed, each tagged with its list.
pub fn map_tasks_by_group(url: &str, body: &str) -> Result<Vec<TaskHeader>> {
    let response: TasksByGroupResponse = parse_json(url, body)?;
    let entity = response.entity;

    let open = entity.open_tasks.unwrap_or_default();
    let closed = entity.closed_tasks.unwrap_or_default();

    let mut tasks = Vec::with_capacity(open.len() + closed.len());
    for api in open {
        tasks.push(map_task_header(url, api, TaskSituation::Open)?);
    }
    for api in closed {
        tasks.push(map_task_header(url, api, TaskSituation::Closed)?);
    }
    Ok(tasks)
}

fn map_task_header(url: &str, api: TaskHeaderApi, situation: TaskSituation) -> Result<TaskHeader> {
    Ok(TaskHeader {
        task_id: api.task_id,
        task_number: api.task_number,
        task_title: api.task_title,
        job_id: api.job_id,
        job_number: api.job_number,
        client_nickname: api.client_nickname,
        creation_date: api.creation_date,
        due_date: api.due_date,
        owner_user_id: optional_id(url, "OwnerUserID", &api.owner_user_id)?,
        situation,
    })
}

pub fn map_task_detail(url: &str, body: &str) -> Result<TaskDetail> {
    let response: TaskDetailResponse = parse_json(url, body)?;
    map_task_data(url, response.task_data, &response.job_data)
}

fn map_task_data(url: &str, task: TaskDataApi, job: &JobDataApi) -> Result<TaskDetail> {
    let task_items = task
        .task_items
        .unwrap_or_default()
        .into_iter()
        .map(|item| -> Result<TaskItem> {
            Ok(TaskItem {
                task_item_id: item.task_item_id,
                old_owner_user_id: optional_id(url, "OldOwnerUserID", &item.old_owner_user_id)?,
                old_owner_name: item.old_owner_name,
                new_owner_user_id: optional_id(url, "NewOwnerUserID", &item.new_owner_user_id)?,
                new_owner_name: item.new_owner_name,
                comment: item.comment.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let tags = task
        .tags
        .unwrap_or_default()
        .into_iter()
        .map(|tag| TaskTag {
            task_tag_id: tag.task_tag_id,
            title: tag.tag_title,
        })
        .collect();

    let sub_tasks = task
        .subtasks
        .unwrap_or_default()
        .into_iter()
        .map(|sub| -> Result<SubTask> {
            let child_task = match sub.child_task {
                Some(child) => Some(Box::new(map_task_data(url, *child, job)?)),
                None => None,
            };
            Ok(SubTask {
                subtask_id: sub.subtask_id,
                task_id: sub.task_id,
                child_task_id: sub.child_task_id,
                title: sub.title,
                child_task,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let last_forward_user = task
        .last_forward_user
        .map(|user| map_forward_user(url, user))
        .transpose()?;

    Ok(TaskDetail {
        task_id: task.task_id,
        task_number: task.task_number,
        task_title: task.task_title,
        member_list_string: task.member_list_string.unwrap_or_default(),
        row_version: task.row_version.filter(|v| !v.is_empty()),
        due_date: task.due_date,
        job_id: job.job_id,
        job_number: job.job_number,
        job_title: job.job_title.clone().unwrap_or_default(),
        client_nickname: job.client.client_nickname.clone(),
        task_items,
        tags,
        sub_tasks,
        last_forward_user,
    })
}

fn map_forward_user(url: &str, api: LastForwardUserApi) -> Result<ForwardUser> {
    Ok(ForwardUser {
        user_id: api.user_id,
        user_login: api.user_login.unwrap_or_default(),
        user_hash_code: api.user_hash_code.unwrap_or_default(),
        full_name: api.full_name.unwrap_or_default(),
        external_code: optional_text(url, "ExternalCode", &api.external_code)?,
        photo_version: api.photo_version,
        creator: api.creator,
    })
}

pub fn map_index_data(url: &str, body: &str) -> Result<IndexData> {
    let api: IndexDataApi = parse_json(url, body)?;
    let pipelines = api
        .pipelines
        .unwrap_or_default()
        .into_iter()
        .map(|pipeline| Pipeline {
            pipeline_id: pipeline.pipeline_id,
            name: pipeline.name,
            description: pipeline.description,
            company_default: pipeline.company_default,
            extranet: pipeline.extranet,
            reset_on_request_type_change: pipeline.reset_on_request_type_change,
            steps: pipeline
                .pipeline_steps
                .unwrap_or_default()
                .into_iter()
                .map(|step| PipelineStep {
                    pipeline_step_id: step.pipeline_step_id,
                    name: step.name,
                    sort_order: step.order,
                })
                .collect(),
        })
        .collect();

    Ok(IndexData {
        user_id: api.user_id,
        user_login: api.user_login.unwrap_or_default(),
        full_name: api.full_name.unwrap_or_default(),
        main_email: api.main_email.unwrap_or_default(),
        user_hash_code: api.user_hash_code.unwrap_or_default(),
        app_main_company_id: api.app_main_company_id,
        company_name: api.company_name,
        pipelines,
    })
}

pub fn map_save_task_response(url: &str, body: &str) -> Result<SaveTaskResponse> {
    let api: SaveTaskResponseApi = parse_json(url, body)?;
    Ok(SaveTaskResponse {
        success: api.success,
        message: api.message.unwrap_or_default(),
        entity: api.entity.map(|saved| SavedTask {
            task_id: saved.task_id,
            task_number: saved.task_number,
            row_version: saved.row_version,
        }),
    })
}

/// JSON body for `/Task/SaveTask`.
pub fn save_task_body(request: &SaveTaskRequest) -> Result<String> {
    let api = SaveTaskApi {
        job_number: request.job_number,
        client_nickname: &request.client_nickname,
        last_task_item_id: request.last_task_item_id,
        task_id: request.task_id,
        task_number: request.task_number,
        member_list_string: &request.member_list_string,
        row_version: request.row_version.as_deref().filter(|v| !v.is_empty()),
        task_title: &request.task_title,
        task_item_comment: &request.task_item_comment,
        owner_user_id: request.owner_user_id,
        spent_time: request.spent_time,
        due_date: request.due_date.format("%Y-%m-%d").to_string(),
        percent_complete: request.percent_complete,
    };
    serde_json::to_string(&api)
        .map_err(|e| TaskrowError::Internal(format!("cannot serialize save task request: {e}")))
}
