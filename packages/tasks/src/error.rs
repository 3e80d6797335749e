// ABOUTME: Error types for task lifecycle management
// ABOUTME: Classifies failures by origin for terminal-status reporting and HTTP mapping

use thiserror::Error;

use crate::storage::StorageError;
use crucible_sandbox::SandboxError;

/// Main error type for task operations
#[derive(Error, Debug)]
pub enum TaskError {
    /// Malformed or missing required input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    /// Hard deadline elapsed before the run finished
    #[error("Task timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Unknown or unhandled error; always surfaced, never dropped
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Type alias for Results that return TaskError
pub type Result<T> = std::result::Result<T, TaskError>;
