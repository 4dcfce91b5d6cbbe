//! Blocking client for the Taskrow task-management service.
//!
//! # Overview
//! `TaskrowClient` authenticates against a tenant (`https://<tenant>.taskrow.com`)
//! with an access key, or with the legacy email/password session, and exposes
//! one method per service endpoint: index data, users, groups, tasks by
//! group, task detail and save task.
//!
//! # Design
//! - `connection` validates the address and credential before any I/O.
//! - `executor` runs each request under a `RetryPolicy`, retrying transient
//!   failures and surfacing fatal ones immediately.
//! - `wire` mirrors the service JSON; `mapper` turns it into the records in
//!   `types`, so callers never see the service's field names or its
//!   negative flags.
//! - `http::Transport` is the only seam that touches the network;
//!   `UreqTransport` is the default.
//! - The library logs through `tracing` and never installs a subscriber.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod http;
pub mod mapper;
pub mod retry;
pub mod session;
pub mod types;
mod wire;

pub use client::{ClientBuilder, TaskrowClient};
pub use config::ClientConfig;
pub use connection::{AccessKey, Credential, ServiceAddress};
pub use error::{Result, TaskrowError, TransportError, TransportErrorKind};
pub use executor::{Authentication, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use retry::RetryPolicy;
pub use types::{
    ForwardUser, Group, IndexData, Office, Pipeline, PipelineStep, SaveTaskRequest, SaveTaskResponse,
    SavedTask, SubTask, TaskDetail, TaskHeader, TaskItem, TaskReference, TaskSituation, TaskTag, User,
    UserHeader,
};
