/// Seconds after which a still-running task gets a warning log entry
pub const TASK_WARNING_SECS: u64 = 240;

/// Hard deadline for a single task run, in seconds
///
/// Must stay above TASK_WARNING_SECS; the supervisor fires the warning
/// once and keeps waiting until this deadline.
pub const TASK_TIMEOUT_SECS: u64 = 300;

/// Idle timeout requested from the sandbox provider, in milliseconds
///
/// Enforced provider-side, independent of the task-level deadline.
pub const SANDBOX_TIMEOUT_MS: u64 = 600_000;

/// Execution template used when a fragment does not name one
pub const DEFAULT_TEMPLATE: &str = "code-interpreter-v1";

/// Port a web fragment is served on when it does not declare one
pub const DEFAULT_WEB_PORT: u16 = 80;

/// Path prefixes excluded from sandbox file tree snapshots
pub const EXCLUDED_TREE_PREFIXES: &[&str] = &[
    "/node_modules",
    "/.next",
    "/.git",
    "/.venv",
    "/__pycache__",
];
