// ABOUTME: Client trait for the external sandbox execution provider
// ABOUTME: Defines the boundary where provider responses are decoded into typed results

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::Result;
use crate::types::{
    CodeExecution, CommandOpts, CommandResult, ConnectOpts, CreateOpts, FragmentFile,
};
use crucible_core::filetree::ProviderEntry;

/// Boundary interface to the sandbox execution provider
#[async_trait]
pub trait SandboxClient: Send + Sync {
    /// Provision a new sandbox of the requested template
    async fn create(&self, template: &str, opts: CreateOpts) -> Result<Box<dyn SandboxHandle>>;

    /// Reconnect to an existing sandbox, e.g. for terminal attach
    async fn connect(&self, sandbox_id: &str, opts: ConnectOpts) -> Result<Box<dyn SandboxHandle>>;
}

/// A live execution environment owned by exactly one run
#[async_trait]
pub trait SandboxHandle: Send + Sync {
    fn sandbox_id(&self) -> &str;

    fn template(&self) -> &str;

    /// Write one file into the sandbox filesystem
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Write a set of independent files concurrently
    ///
    /// Order-independent: no write depends on another, so all of them are
    /// in flight at once and the call resolves when every write has landed.
    async fn write_files(&self, files: &[FragmentFile]) -> Result<()> {
        try_join_all(
            files
                .iter()
                .map(|file| self.write_file(&file.file_path, &file.file_content)),
        )
        .await?;
        Ok(())
    }

    /// Read a file back out of the sandbox
    async fn read_file(&self, path: &str) -> Result<String>;

    /// List the sandbox filesystem as the provider's nested listing
    async fn list_files(&self, path: &str) -> Result<Vec<ProviderEntry>>;

    /// Run a shell command inside the sandbox
    async fn run_command(&self, command: &str, opts: CommandOpts) -> Result<CommandResult>;

    /// Execute code in the sandbox interpreter
    async fn run_code(&self, code: &str) -> Result<CodeExecution>;

    /// Resolve the externally reachable hostname for a sandbox port
    async fn get_host(&self, port: u16) -> Result<String>;

    /// Terminate the sandbox
    async fn kill(&self) -> Result<()>;
}
