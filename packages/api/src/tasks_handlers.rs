// ABOUTME: HTTP request handlers for task lifecycle operations
// ABOUTME: Handles task creation, polling reads, and bulk deletion of terminal tasks

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crucible_tasks::{CreateTaskInput, TaskManager, TaskStatus};

use super::response::{respond_with, task_error_response, ApiResponse};

/// Shared state for task operations
#[derive(Clone)]
pub struct TasksState {
    pub manager: Arc<TaskManager>,
}

/// Create a new task and schedule its background execution
///
/// POST /api/tasks
pub async fn create_task(
    State(state): State<TasksState>,
    Json(input): Json<CreateTaskInput>,
) -> Response {
    info!("Creating task");

    match state.manager.create_task(input).await {
        Ok(task) => respond_with(StatusCode::CREATED, task),
        Err(err) => task_error_response(&err),
    }
}

/// List all tasks
///
/// GET /api/tasks
pub async fn list_tasks(State(state): State<TasksState>) -> Response {
    match state.manager.get_all_tasks().await {
        Ok(tasks) => respond_with(StatusCode::OK, tasks),
        Err(err) => task_error_response(&err),
    }
}

/// Get a single task for status polling
///
/// GET /api/tasks/{task_id}
pub async fn get_task(
    State(state): State<TasksState>,
    Path(task_id): Path<String>,
) -> Response {
    match state.manager.get_task(&task_id).await {
        Ok(task) => respond_with(StatusCode::OK, task),
        Err(err) => task_error_response(&err),
    }
}

/// Query parameters for bulk task deletion
#[derive(Deserialize)]
pub struct DeleteTasksParams {
    /// Comma-separated set of `completed` / `failed`
    pub statuses: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteTasksResponse {
    pub deleted: u64,
}

/// Bulk-delete tasks in the requested terminal statuses
///
/// DELETE /api/tasks?statuses=completed,failed
pub async fn delete_tasks(
    State(state): State<TasksState>,
    Query(params): Query<DeleteTasksParams>,
) -> Response {
    let raw = params.statuses.unwrap_or_default();

    let statuses = match parse_statuses(&raw) {
        Ok(statuses) => statuses,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(message)),
            )
                .into_response();
        }
    };

    info!("Bulk-deleting tasks with statuses: {}", raw);

    match state.manager.delete_tasks_by_status(&statuses).await {
        Ok(deleted) => respond_with(StatusCode::OK, DeleteTasksResponse { deleted }),
        Err(err) => task_error_response(&err),
    }
}

/// Parse the comma-separated status set from the query string.
///
/// The UI sends `failed` for the `error` status; anything outside the
/// two terminal tokens is rejected rather than ignored.
fn parse_statuses(raw: &str) -> Result<Vec<TaskStatus>, String> {
    let mut statuses = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        match token {
            "completed" => statuses.push(TaskStatus::Completed),
            "failed" | "error" => statuses.push(TaskStatus::Error),
            other => return Err(format!("invalid status: {}", other)),
        }
    }
    if statuses.is_empty() {
        return Err("no statuses given for deletion".to_string());
    }
    Ok(statuses)
}
