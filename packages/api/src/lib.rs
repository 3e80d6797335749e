// ABOUTME: HTTP API layer for Crucible providing REST endpoints and routing
// ABOUTME: Integration layer over the task manager and fragment runner

use axum::{
    routing::{get, post},
    Router,
};

pub mod response;
pub mod sandbox_handlers;
pub mod tasks_handlers;

pub use sandbox_handlers::SandboxState;
pub use tasks_handlers::TasksState;

/// Creates the tasks API router (nested under /api/tasks)
pub fn create_tasks_router() -> Router<TasksState> {
    Router::new()
        .route(
            "/",
            post(tasks_handlers::create_task)
                .get(tasks_handlers::list_tasks)
                .delete(tasks_handlers::delete_tasks),
        )
        .route("/{task_id}", get(tasks_handlers::get_task))
}

/// Creates the sandbox API router (nested under /api/sandbox)
pub fn create_sandbox_router() -> Router<SandboxState> {
    Router::new().route("/", post(sandbox_handlers::run_fragment))
}
