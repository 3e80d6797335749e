// ABOUTME: Task and task log type definitions
// ABOUTME: Structures for tracking requested work, its status, and its ordered log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crucible_sandbox::Fragment;

/// Task lifecycle status
///
/// `pending --> processing --> completed | error`; no transition leaves
/// a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "error" => Some(TaskStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

/// Kind of a task log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLogType {
    Info,
    Error,
    Success,
    Command,
}

/// Immutable log entry owned by its parent task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub log_type: TaskLogType,
    pub message: String,
}

impl TaskLog {
    pub fn new(log_type: TaskLogType, message: impl Into<String>) -> Self {
        Self {
            id: format!("log-{}", nanoid::nanoid!()),
            timestamp: Utc::now(),
            log_type,
            message: message.into(),
        }
    }
}

/// A persisted unit of requested work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub progress: i64,
    pub prompt: String,
    pub repo_url: Option<String>,
    pub selected_agent: Option<String>,
    pub selected_model: Option<String>,
    pub sandbox_url: Option<String>,
    pub branch_name: Option<String>,
    pub logs: Vec<TaskLog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskInput {
    /// Absent prompt deserializes to empty and is rejected by validation
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub selected_agent: Option<String>,
    #[serde(default)]
    pub selected_model: Option<String>,
    /// Pre-generated code to execute; tasks without one go through the
    /// fragment planner
    #[serde(default)]
    pub fragment: Option<Fragment>,
}
