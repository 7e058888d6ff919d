// src/engine/outcome.rs

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::dag::TaskState;
use crate::engine::TaskName;
use crate::pipeline::TransformError;

/// Why a task failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("{} file(s) failed to transform", .0.len())]
    Transforms(Vec<TransformError>),

    #[error("command `{cmd}` exited with code {code}: {stderr}")]
    Command {
        cmd: String,
        code: i32,
        stderr: String,
    },

    #[error("{0}")]
    Io(String),

    #[error("output {path:?} was also written by '{other}' in the same stage")]
    OutputConflict { path: PathBuf, other: TaskName },

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskFailure {
    /// One line per underlying cause, for user-facing reports.
    pub fn causes(&self) -> Vec<String> {
        match self {
            TaskFailure::Transforms(errors) => errors.iter().map(|e| e.to_string()).collect(),
            other => vec![other.to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Result of one scheduler invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: u64,
    pub stages: Vec<Vec<TaskName>>,
    /// Final state of every task in the plan, in plan order.
    pub states: Vec<(TaskName, TaskState)>,
    /// Failed tasks in plan order.
    pub failures: Vec<(TaskName, TaskFailure)>,
    /// Tasks never started because an earlier stage failed.
    pub skipped: Vec<TaskName>,
    pub written: Vec<PathBuf>,
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        if self.failures.is_empty() {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Succeeded
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, state)| *state)
    }

    pub fn failed_tasks(&self) -> Vec<&str> {
        self.failures.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn failure_of(&self, task: &str) -> Option<&TaskFailure> {
        self.failures
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, failure)| failure)
    }

    /// Multi-line description of every failed task and its causes.
    pub fn describe_failures(&self) -> String {
        let mut out = String::new();
        for (task, failure) in &self.failures {
            let _ = writeln!(out, "task '{task}' failed: {failure}");
            if let TaskFailure::Transforms(_) = failure {
                for cause in failure.causes() {
                    let _ = writeln!(out, "  - {cause}");
                }
            }
        }
        if !self.skipped.is_empty() {
            let _ = writeln!(out, "skipped: {}", self.skipped.join(", "));
        }
        out
    }
}
