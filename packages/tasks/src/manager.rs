// ABOUTME: Task lifecycle manager orchestrating storage, planning, and sandbox execution
// ABOUTME: Dispatches one supervised background worker per task and guarantees a terminal status

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::error::{Result, TaskError};
use crate::logger::TaskLogger;
use crate::planner::FragmentPlanner;
use crate::storage::TaskStorage;
use crate::supervisor::supervise;
use crate::types::{CreateTaskInput, Task, TaskStatus};
use crucible_core::constants::{TASK_TIMEOUT_SECS, TASK_WARNING_SECS};
use crucible_sandbox::{ExecutionResult, Fragment, FragmentRunner, RunCredentials};

/// Task lifecycle manager
///
/// Owns the pending/processing/completed/error state machine. Each
/// created task gets exactly one detached worker; the task row is only
/// ever mutated by that worker, so no locking is needed around it.
#[derive(Clone)]
pub struct TaskManager {
    storage: Arc<TaskStorage>,
    runner: Arc<FragmentRunner>,
    planner: Arc<dyn FragmentPlanner>,
    warn_after: Duration,
    deadline: Duration,
}

impl TaskManager {
    pub fn new(
        storage: Arc<TaskStorage>,
        runner: Arc<FragmentRunner>,
        planner: Arc<dyn FragmentPlanner>,
    ) -> Self {
        Self {
            storage,
            runner,
            planner,
            warn_after: Duration::from_secs(TASK_WARNING_SECS),
            deadline: Duration::from_secs(TASK_TIMEOUT_SECS),
        }
    }

    /// Override supervisor timings; the hard deadline must stay above the
    /// warning threshold
    pub fn with_timeouts(mut self, warn_after: Duration, deadline: Duration) -> Self {
        self.warn_after = warn_after;
        self.deadline = deadline;
        self
    }

    /// Validate the input, persist a pending task, and schedule its
    /// worker. Returns as soon as the task exists; execution proceeds in
    /// the background and is observed by polling.
    pub async fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        if input.prompt.trim().is_empty() {
            return Err(TaskError::Validation("prompt is required".to_string()));
        }

        let task = self.storage.create_task(&input).await?;
        info!("Created task {}", task.id);

        let manager = self.clone();
        let spawned = task.clone();
        let fragment = input.fragment;
        tokio::spawn(async move {
            manager.run_worker(spawned, fragment).await;
        });

        Ok(task)
    }

    /// Read-only projection of all persisted tasks
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.storage.list_tasks().await?)
    }

    /// Read-only projection of one task
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        Ok(self.storage.get_task(task_id).await?)
    }

    /// Bulk-remove tasks in the given terminal statuses.
    ///
    /// Non-terminal statuses are rejected outright: a pending or
    /// processing task still has a live worker that will write to it.
    pub async fn delete_tasks_by_status(&self, statuses: &[TaskStatus]) -> Result<u64> {
        if statuses.is_empty() {
            return Err(TaskError::Validation(
                "no statuses given for deletion".to_string(),
            ));
        }
        if let Some(status) = statuses.iter().find(|status| !status.is_terminal()) {
            return Err(TaskError::Validation(format!(
                "cannot delete tasks in non-terminal status '{}'",
                status.as_str()
            )));
        }

        Ok(self.storage.delete_by_statuses(statuses).await?)
    }

    /// Worker entry point: every exit path ends in a terminal status.
    async fn run_worker(&self, task: Task, fragment: Option<Fragment>) {
        let logger = TaskLogger::new(Arc::clone(&self.storage), task.id.clone());

        if let Err(err) = self.process_task(&task, fragment, &logger).await {
            let message = err.to_string();
            error!("Task {} failed: {}", task.id, message);

            if let Err(log_err) = logger.error(message.as_str()).await {
                error!("Failed to record failure for task {}: {}", task.id, log_err);
            }
            if let Err(status_err) = logger.status(TaskStatus::Error).await {
                error!(
                    "Failed to mark task {} as errored: {}",
                    task.id, status_err
                );
            }
        }
    }

    async fn process_task(
        &self,
        task: &Task,
        fragment: Option<Fragment>,
        logger: &TaskLogger,
    ) -> Result<()> {
        logger.status(TaskStatus::Processing).await?;
        logger.info("Task execution started").await?;
        logger.progress(10).await?;

        let warn_secs = self.warn_after.as_secs();
        let deadline_secs = self.deadline.as_secs();
        let on_warn = async move {
            if let Err(err) = logger
                .info(format!(
                    "Task is still running after {}s and will be stopped at {}s",
                    warn_secs, deadline_secs
                ))
                .await
            {
                error!("Failed to record warning for task {}: {}", task.id, err);
            }
        };

        supervise(
            self.warn_after,
            self.deadline,
            on_warn,
            self.execute(task, fragment, logger),
        )
        .await?;

        logger.progress(100).await?;
        logger.success("Task completed").await?;
        logger.status(TaskStatus::Completed).await?;
        Ok(())
    }

    async fn execute(
        &self,
        task: &Task,
        fragment: Option<Fragment>,
        logger: &TaskLogger,
    ) -> Result<()> {
        let fragment = match fragment {
            Some(fragment) => Some(fragment),
            None => {
                logger.info("Planning executable work for prompt").await?;
                self.planner.plan(task).await?
            }
        };

        let branch = branch_name(&task.id);
        self.storage.set_branch_name(&task.id, &branch).await?;
        logger
            .info(format!("Prepared working branch {}", branch))
            .await?;
        logger.progress(30).await?;

        let Some(fragment) = fragment else {
            logger
                .info("No executable fragment for this task; skipping sandbox run")
                .await?;
            return Ok(());
        };

        logger
            .command(format!("execute fragment ({})", fragment.template))
            .await?;
        logger.progress(50).await?;

        let run = self
            .runner
            .run_fragment(&fragment, &RunCredentials::default())
            .await?;
        logger.progress(80).await?;

        if let ExecutionResult::Web { url, .. } = &run.result {
            self.storage.set_sandbox_url(&task.id, url).await?;
        }
        logger
            .info(format!("Sandbox {} finished", run.sbx_id))
            .await?;
        Ok(())
    }
}

fn branch_name(task_id: &str) -> String {
    let suffix = task_id.strip_prefix("task-").unwrap_or(task_id);
    let short: String = suffix.chars().take(8).collect();
    format!("crucible/{}", short)
}
