// ABOUTME: Planner seam between task prompts and runnable fragments
// ABOUTME: Abstracts the external code-generation collaborator behind a trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Task;
use crucible_sandbox::Fragment;

/// Turns a task into a runnable fragment.
///
/// The generation backend (an LLM service) lives outside this engine;
/// implementations adapt it. Returning `None` means the task carries no
/// executable work and completes after its metadata milestones.
#[async_trait]
pub trait FragmentPlanner: Send + Sync {
    async fn plan(&self, task: &Task) -> Result<Option<Fragment>>;
}

/// Planner for deployments without a generation backend
pub struct NoopPlanner;

#[async_trait]
impl FragmentPlanner for NoopPlanner {
    async fn plan(&self, _task: &Task) -> Result<Option<Fragment>> {
        Ok(None)
    }
}
