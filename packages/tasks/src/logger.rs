// ABOUTME: Append-only structured log writer bound to one task
// ABOUTME: Records log entries and aggregate status/progress through task storage

use std::sync::Arc;

use crate::storage::{StorageError, TaskStorage};
use crate::types::{TaskLog, TaskLogType, TaskStatus};

/// Log sink for the worker that owns a task.
///
/// Entries are appended in invocation order and never reordered or
/// deduplicated; each write also bumps the task's `updated_at`.
#[derive(Clone)]
pub struct TaskLogger {
    storage: Arc<TaskStorage>,
    task_id: String,
}

impl TaskLogger {
    pub fn new(storage: Arc<TaskStorage>, task_id: String) -> Self {
        Self { storage, task_id }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub async fn append(
        &self,
        log_type: TaskLogType,
        message: impl Into<String>,
    ) -> Result<(), StorageError> {
        self.storage
            .append_log(&self.task_id, TaskLog::new(log_type, message))
            .await
    }

    pub async fn info(&self, message: impl Into<String>) -> Result<(), StorageError> {
        self.append(TaskLogType::Info, message).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Result<(), StorageError> {
        self.append(TaskLogType::Error, message).await
    }

    pub async fn success(&self, message: impl Into<String>) -> Result<(), StorageError> {
        self.append(TaskLogType::Success, message).await
    }

    pub async fn command(&self, message: impl Into<String>) -> Result<(), StorageError> {
        self.append(TaskLogType::Command, message).await
    }

    pub async fn progress(&self, progress: i64) -> Result<(), StorageError> {
        self.storage.update_progress(&self.task_id, progress).await
    }

    pub async fn status(&self, status: TaskStatus) -> Result<(), StorageError> {
        self.storage.update_status(&self.task_id, status).await
    }
}
