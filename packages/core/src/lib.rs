// ABOUTME: Core types and utilities shared across Crucible packages
// ABOUTME: Holds engine-wide constants and the filesystem tree builder

pub mod constants;
pub mod filetree;

// Re-export constants
pub use constants::{
    DEFAULT_TEMPLATE, DEFAULT_WEB_PORT, EXCLUDED_TREE_PREFIXES, SANDBOX_TIMEOUT_MS,
    TASK_TIMEOUT_SECS, TASK_WARNING_SECS,
};

// Re-export tree types
pub use filetree::{build_tree, map_provider_entries, FileSystemNode, FlatEntry, ProviderEntry};
