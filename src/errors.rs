// src/errors.rs

//! Crate-wide error types.
//!
//! [`AssetdagError`] covers configuration and orchestration failures;
//! [`ActionError`] is what a single task action reports when its collaborator
//! (a tool process, the filesystem, a remote service) fails.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cyclic dependency between tasks: {}", format_cycle(.0))]
    DagCycle(Vec<TaskName>),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: TaskName,
        #[source]
        source: ActionError,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetdagError {
    /// Name of the task whose action failed, if this is a task failure.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            AssetdagError::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

/// Failure reported by a task action.
#[derive(Error, Debug)]
pub enum ActionError {
    /// An external tool exited unsuccessfully or produced no output.
    #[error("tool `{command}` failed: {message}")]
    Tool { command: String, message: String },

    #[error("filesystem error at {}: {message}", .path.display())]
    Filesystem { path: PathBuf, message: String },

    /// A remote collaborator could not be reached or answered garbage.
    #[error("network error: {0}")]
    Network(String),
}

impl ActionError {
    pub fn fs(path: impl AsRef<Path>, err: impl std::fmt::Display) -> Self {
        ActionError::Filesystem {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn tool(command: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::Tool {
            command: command.into(),
            message: message.into(),
        }
    }
}

fn format_cycle(members: &[TaskName]) -> String {
    match members.first() {
        Some(first) => format!("{} -> {}", members.join(" -> "), first),
        None => String::from("<empty>"),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
