// ABOUTME: Shared API response types and error handling
// ABOUTME: Provides consistent response format and error status mapping across endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use serde::Serialize;

use crucible_sandbox::SandboxError;
use crucible_tasks::{StorageError, TaskError};

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Respond with `status` and a success envelope
pub fn respond_with<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, ResponseJson(ApiResponse::success(data))).into_response()
}

/// Map a sandbox error to the status code its origin calls for
fn sandbox_status(err: &SandboxError) -> StatusCode {
    match err {
        SandboxError::InvalidFragment(_) => StatusCode::BAD_REQUEST,
        SandboxError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a sandbox error into its HTTP response
pub fn sandbox_error_response(err: &SandboxError) -> Response {
    (
        sandbox_status(err),
        ResponseJson(ApiResponse::<()>::error(err.to_string())),
    )
        .into_response()
}

/// Convert a task error into its HTTP response
pub fn task_error_response(err: &TaskError) -> Response {
    let status = match err {
        TaskError::Validation(_) => StatusCode::BAD_REQUEST,
        TaskError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
        TaskError::Sandbox(sandbox_err) => sandbox_status(sandbox_err),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        ResponseJson(ApiResponse::<()>::error(err.to_string())),
    )
        .into_response()
}
