// ABOUTME: Sandbox orchestration protocol for fragment execution
// ABOUTME: Drives provision, deploy, execute, snapshot, and teardown against the provider

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::client::{SandboxClient, SandboxHandle};
use crate::error::{Result, SandboxError};
use crate::types::{
    CommandOpts, CreateOpts, ExecutionResult, Fragment, FragmentCode, FragmentRun, RunCredentials,
};
use crucible_core::constants::{
    DEFAULT_TEMPLATE, DEFAULT_WEB_PORT, EXCLUDED_TREE_PREFIXES, SANDBOX_TIMEOUT_MS,
};
use crucible_core::filetree::map_provider_entries;

/// Template id of the in-process interpreter environment
const INTERPRETER_TEMPLATE: &str = "code-interpreter-v1";

/// Runs fragments through the provision, deploy, execute protocol.
///
/// Not idempotent: every call provisions a fresh sandbox. The task
/// manager guarantees at most one invocation per task.
pub struct FragmentRunner {
    client: Arc<dyn SandboxClient>,
}

impl FragmentRunner {
    pub fn new(client: Arc<dyn SandboxClient>) -> Self {
        Self { client }
    }

    pub async fn run_fragment(
        &self,
        fragment: &Fragment,
        credentials: &RunCredentials,
    ) -> Result<FragmentRun> {
        validate_fragment(fragment)?;

        let template = if fragment.template.is_empty() {
            DEFAULT_TEMPLATE
        } else {
            fragment.template.as_str()
        };

        let mut metadata = HashMap::new();
        metadata.insert("template".to_string(), template.to_string());
        if let Some(user_id) = &credentials.user_id {
            metadata.insert("userID".to_string(), user_id.clone());
        }

        // Provision. Failure here aborts the run; nothing exists yet, so
        // there is nothing to clean up.
        let handle = self
            .client
            .create(
                template,
                CreateOpts {
                    timeout_ms: SANDBOX_TIMEOUT_MS,
                    metadata,
                    api_key: credentials.api_key.clone(),
                },
            )
            .await
            .map_err(classify_creation)?;

        info!(
            "Sandbox {} provisioned for template {}",
            handle.sandbox_id(),
            template
        );

        match self.execute(handle.as_ref(), fragment, template).await {
            Ok(result) => Ok(FragmentRun {
                sbx_id: handle.sandbox_id().to_string(),
                result,
            }),
            Err(err) => {
                // Best-effort teardown; a failed kill must never mask the
                // execution error being reported.
                if let Err(kill_err) = handle.kill().await {
                    warn!(
                        "Failed to kill sandbox {}: {}",
                        handle.sandbox_id(),
                        kill_err
                    );
                }
                Err(classify_execution(err))
            }
        }
    }

    async fn execute(
        &self,
        handle: &dyn SandboxHandle,
        fragment: &Fragment,
        template: &str,
    ) -> Result<ExecutionResult> {
        // Install before any file lands: the install command may mutate
        // the working directory.
        if fragment.has_additional_dependencies {
            if let Some(command) = &fragment.install_dependencies_command {
                info!(
                    "Installing dependencies in sandbox {}: {}",
                    handle.sandbox_id(),
                    command
                );
                let result = handle.run_command(command, CommandOpts::default()).await?;
                if result.exit_code != 0 {
                    return Err(SandboxError::Execution(format!(
                        "dependency install exited with code {}: {}",
                        result.exit_code, result.stderr
                    )));
                }
            }
        }

        match &fragment.code {
            FragmentCode::Single(content) => {
                let path = fragment.file_path.as_deref().unwrap_or("main.py");
                handle.write_file(path, content).await?;
            }
            FragmentCode::Files(files) => {
                handle.write_files(files).await?;
            }
        }

        if template == INTERPRETER_TEMPLATE {
            self.execute_interpreter(handle, fragment).await
        } else {
            self.execute_web(handle, fragment).await
        }
    }

    async fn execute_interpreter(
        &self,
        handle: &dyn SandboxHandle,
        fragment: &Fragment,
    ) -> Result<ExecutionResult> {
        let execution = handle.run_code(interpreter_source(fragment)).await?;
        let files = self.snapshot(handle).await?;

        Ok(ExecutionResult::Interpreter {
            stdout: execution.stdout,
            stderr: execution.stderr,
            runtime_error: execution.runtime_error,
            cell_results: execution.results,
            files,
        })
    }

    async fn execute_web(
        &self,
        handle: &dyn SandboxHandle,
        fragment: &Fragment,
    ) -> Result<ExecutionResult> {
        let port = fragment.port.unwrap_or(DEFAULT_WEB_PORT);

        // The template's start flow is the declared command run with the
        // serving port in its environment.
        if let Some(command) = &fragment.install_dependencies_command {
            let mut envs = HashMap::new();
            envs.insert("PORT".to_string(), port.to_string());
            let result = handle
                .run_command(command, CommandOpts { envs, cwd: None })
                .await?;
            if result.exit_code != 0 {
                return Err(SandboxError::Execution(format!(
                    "start command exited with code {}: {}",
                    result.exit_code, result.stderr
                )));
            }
        }

        let host = handle.get_host(port).await?;
        let files = self.snapshot(handle).await?;

        Ok(ExecutionResult::Web {
            url: format!("https://{}", host),
            files,
        })
    }

    /// Snapshot the sandbox file tree for display, pruning dependency caches
    async fn snapshot(
        &self,
        handle: &dyn SandboxHandle,
    ) -> Result<Vec<crucible_core::filetree::FileSystemNode>> {
        let listing = handle.list_files("/").await?;
        Ok(map_provider_entries(&listing, EXCLUDED_TREE_PREFIXES))
    }
}

fn validate_fragment(fragment: &Fragment) -> Result<()> {
    match &fragment.code {
        FragmentCode::Single(content) if content.is_empty() => Err(
            SandboxError::InvalidFragment("fragment code is empty".to_string()),
        ),
        FragmentCode::Files(files) if files.is_empty() => Err(SandboxError::InvalidFragment(
            "fragment contains no files".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Source passed to the interpreter: the single code body, or the file
/// matching the fragment's declared path, falling back to the first file
fn interpreter_source(fragment: &Fragment) -> &str {
    match &fragment.code {
        FragmentCode::Single(content) => content,
        FragmentCode::Files(files) => fragment
            .file_path
            .as_deref()
            .and_then(|path| files.iter().find(|file| file.file_path == path))
            .or_else(|| files.first())
            .map(|file| file.file_content.as_str())
            .unwrap_or(""),
    }
}

fn classify_creation(err: SandboxError) -> SandboxError {
    match err {
        // Missing credentials stay distinguishable: operator action, not retry
        SandboxError::Configuration(_) => err,
        other => SandboxError::Creation(other.to_string()),
    }
}

fn classify_execution(err: SandboxError) -> SandboxError {
    match err {
        SandboxError::Execution(_) | SandboxError::Configuration(_) => err,
        other => SandboxError::Execution(other.to_string()),
    }
}
