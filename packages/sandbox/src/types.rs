// ABOUTME: Core type definitions for fragment execution
// ABOUTME: Defines fragments, execution results, and provider call payloads

use crucible_core::filetree::FileSystemNode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A generated code artifact submitted for execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    /// Execution environment kind; empty string falls back to the
    /// interpreter template
    #[serde(default)]
    pub template: String,
    /// Code payload: one file body or a set of files
    pub code: FragmentCode,
    #[serde(default)]
    pub has_additional_dependencies: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dependencies_command: Option<String>,
    /// Target path for single-file code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Port a web fragment serves on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Fragment code payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FragmentCode {
    Files(Vec<FragmentFile>),
    Single(String),
}

/// One file of a multi-file fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentFile {
    pub file_path: String,
    pub file_content: String,
}

/// Optional tenant credentials forwarded to the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Runtime error raised inside the interpreter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeError {
    pub name: String,
    pub value: String,
    pub traceback: String,
}

/// Outcome of running a fragment, one variant per execution kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionResult {
    #[serde(rename_all = "camelCase")]
    Interpreter {
        stdout: Vec<String>,
        stderr: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        runtime_error: Option<RuntimeError>,
        cell_results: Vec<serde_json::Value>,
        files: Vec<FileSystemNode>,
    },
    #[serde(rename_all = "camelCase")]
    Web {
        url: String,
        files: Vec<FileSystemNode>,
    },
}

/// A completed fragment run: provider sandbox id plus the typed result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRun {
    pub sbx_id: String,
    #[serde(flatten)]
    pub result: ExecutionResult,
}

/// Options for provisioning a new sandbox
#[derive(Debug, Clone, Default)]
pub struct CreateOpts {
    /// Idle timeout enforced by the provider, independent of any
    /// task-level deadline
    pub timeout_ms: u64,
    pub metadata: HashMap<String, String>,
    /// Per-request key overriding the configured one
    pub api_key: Option<String>,
}

/// Options for reconnecting to an existing sandbox
#[derive(Debug, Clone, Default)]
pub struct ConnectOpts {
    pub timeout_ms: u64,
    pub api_key: Option<String>,
}

/// Options for running a shell command inside a sandbox
#[derive(Debug, Clone, Default)]
pub struct CommandOpts {
    pub envs: HashMap<String, String>,
    pub cwd: Option<String>,
}

/// Result of a shell command run inside a sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Result of executing code in the sandbox interpreter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecution {
    #[serde(default)]
    pub stdout: Vec<String>,
    #[serde(default)]
    pub stderr: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<RuntimeError>,
    /// Structured cell results (rich display payloads), opaque to the engine
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}
