// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

use crate::collab::PublishError;
use crate::engine::{RunOutcome, TaskName};

/// Structural problems with the task graph.
///
/// These are always detected before any task body runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("cycle detected in task graph: {}", format_cycle(.0))]
    Cycle(Vec<TaskName>),

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),
}

fn format_cycle(names: &[TaskName]) -> String {
    let mut out = names.join(" -> ");
    if let Some(first) = names.first() {
        out.push_str(" -> ");
        out.push_str(first);
    }
    out
}

/// Why `deploy` did not publish, or publishing failed.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The build failed; nothing was published.
    #[error("build failed: {}", .0.failed_tasks().join(", "))]
    Build(RunOutcome),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("no [publish] section configured")]
    NoPublishTarget,
}

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ForgeError>;
