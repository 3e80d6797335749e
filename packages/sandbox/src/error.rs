// ABOUTME: Error types for sandbox provisioning and fragment execution
// ABOUTME: Classifies failures by origin so callers never inspect message strings

use thiserror::Error;

/// Main error type for sandbox operations
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Required provider credentials are absent; operator action needed
    #[error("Sandbox provider is not configured: {0}")]
    Configuration(String),

    /// Malformed fragment submitted for execution
    #[error("Invalid fragment: {0}")]
    InvalidFragment(String),

    /// Provider failed to provision an environment; nothing to clean up
    #[error("Failed to create sandbox: {0}")]
    Creation(String),

    /// Failure during dependency install, file deploy, or code execution
    #[error("Sandbox execution failed: {0}")]
    Execution(String),

    /// Provider API rejected a request
    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure talking to the provider
    #[error("Provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown or unhandled error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Type alias for Results that return SandboxError
pub type Result<T> = std::result::Result<T, SandboxError>;
