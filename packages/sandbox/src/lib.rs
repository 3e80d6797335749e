// ABOUTME: Sandbox provider adapter and fragment execution protocol
// ABOUTME: Provisions ephemeral environments and drives install, deploy, and run steps

pub mod client;
pub mod e2b;
pub mod error;
pub mod runner;
pub mod types;

pub use client::{SandboxClient, SandboxHandle};
pub use e2b::{HttpSandboxClient, SandboxConfig};
pub use error::{Result, SandboxError};
pub use runner::FragmentRunner;
pub use types::{
    CodeExecution, CommandOpts, CommandResult, ConnectOpts, CreateOpts, ExecutionResult, Fragment,
    FragmentCode, FragmentFile, FragmentRun, RunCredentials, RuntimeError,
};
