// ABOUTME: HTTP request handlers for synchronous fragment execution
// ABOUTME: Runs a fragment in a fresh sandbox and returns the typed execution result

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crucible_sandbox::{Fragment, FragmentRunner, RunCredentials};

use super::response::{respond_with, sandbox_error_response, ApiResponse};

/// Shared state for sandbox operations
#[derive(Clone)]
pub struct SandboxState {
    pub runner: Arc<FragmentRunner>,
}

/// Request to execute a fragment
#[derive(Deserialize)]
pub struct RunFragmentRequest {
    pub fragment: Option<Fragment>,
    #[serde(flatten)]
    pub credentials: RunCredentials,
}

/// Execute a fragment in a fresh sandbox
///
/// POST /api/sandbox
pub async fn run_fragment(
    State(state): State<SandboxState>,
    Json(request): Json<RunFragmentRequest>,
) -> Response {
    let Some(fragment) = request.fragment else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("fragment is required".to_string())),
        )
            .into_response();
    };

    info!("Running fragment with template: {}", fragment.template);

    match state
        .runner
        .run_fragment(&fragment, &request.credentials)
        .await
    {
        Ok(run) => respond_with(StatusCode::OK, run),
        Err(err) => sandbox_error_response(&err),
    }
}
