// ABOUTME: Task storage layer using SQLite
// ABOUTME: Handles task rows with their log sequence stored as a JSON array column

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::types::{CreateTaskInput, Task, TaskLog, TaskStatus};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid task status in database: {0}")]
    InvalidStatus(String),
}

type Result<T> = std::result::Result<T, StorageError>;

/// Storage layer for task rows
#[derive(Clone)]
pub struct TaskStorage {
    pool: SqlitePool,
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the tasks table if it does not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'pending',
                progress INTEGER NOT NULL DEFAULT 0,
                prompt TEXT NOT NULL,
                repo_url TEXT,
                selected_agent TEXT,
                selected_model TEXT,
                sandbox_url TEXT,
                branch_name TEXT,
                logs TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Persist a new task in pending status
    pub async fn create_task(&self, input: &CreateTaskInput) -> Result<Task> {
        let task_id = format!("task-{}", nanoid::nanoid!());
        let now = Utc::now();

        debug!("Creating task: {}", task_id);

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, status, progress, prompt, repo_url, selected_agent,
                selected_model, logs, created_at, updated_at
            ) VALUES (?, ?, 0, ?, ?, ?, ?, '[]', ?, ?)
            "#,
        )
        .bind(&task_id)
        .bind(TaskStatus::Pending.as_str())
        .bind(&input.prompt)
        .bind(&input.repo_url)
        .bind(&input.selected_agent)
        .bind(&input.selected_model)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_task(&task_id).await
    }

    /// Get a single task by ID
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(task_id.to_string()))?;

        row_to_task(&row)
    }

    /// List all tasks, most recently created first
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_task).collect()
    }

    /// Update a task's status
    pub async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        debug!("Updating task {} status to {}", task_id, status.as_str());

        let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(task_id.to_string()));
        }
        Ok(())
    }

    /// Update a task's progress percentage
    pub async fn update_progress(&self, task_id: &str, progress: i64) -> Result<()> {
        let result = sqlx::query("UPDATE tasks SET progress = ?, updated_at = ? WHERE id = ?")
            .bind(progress)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(task_id.to_string()));
        }
        Ok(())
    }

    /// Record the externally reachable sandbox URL for a task
    pub async fn set_sandbox_url(&self, task_id: &str, sandbox_url: &str) -> Result<()> {
        let result = sqlx::query("UPDATE tasks SET sandbox_url = ?, updated_at = ? WHERE id = ?")
            .bind(sandbox_url)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(task_id.to_string()));
        }
        Ok(())
    }

    /// Record the working branch prepared for a task
    pub async fn set_branch_name(&self, task_id: &str, branch_name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE tasks SET branch_name = ?, updated_at = ? WHERE id = ?")
            .bind(branch_name)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(task_id.to_string()));
        }
        Ok(())
    }

    /// Append one log entry to a task's ordered log sequence.
    ///
    /// The store offers no native array append, so the current sequence
    /// is read, extended, and written back inside one transaction.
    pub async fn append_log(&self, task_id: &str, log: TaskLog) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT logs FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::NotFound(task_id.to_string()))?;

        let raw: String = row.try_get("logs")?;
        let mut logs: Vec<TaskLog> = serde_json::from_str(&raw)?;
        logs.push(log);

        sqlx::query("UPDATE tasks SET logs = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&logs)?)
            .bind(Utc::now())
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Bulk-delete tasks whose status is in the given set; returns the
    /// number of rows removed
    pub async fn delete_by_statuses(&self, statuses: &[TaskStatus]) -> Result<u64> {
        if statuses.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!("DELETE FROM tasks WHERE status IN ({})", placeholders);
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task> {
    let status_raw: String = row.try_get("status")?;
    let status = TaskStatus::from_str(&status_raw)
        .ok_or_else(|| StorageError::InvalidStatus(status_raw.clone()))?;

    let logs_raw: String = row.try_get("logs")?;
    let logs: Vec<TaskLog> = serde_json::from_str(&logs_raw)?;

    Ok(Task {
        id: row.try_get("id")?,
        status,
        progress: row.try_get("progress")?,
        prompt: row.try_get("prompt")?,
        repo_url: row.try_get("repo_url")?,
        selected_agent: row.try_get("selected_agent")?,
        selected_model: row.try_get("selected_model")?,
        sandbox_url: row.try_get("sandbox_url")?,
        branch_name: row.try_get("branch_name")?,
        logs,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
