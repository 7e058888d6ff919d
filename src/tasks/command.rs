// src/tasks/command.rs

use std::path::PathBuf;

use tracing::info;

use crate::dag::{TaskBody, TaskFuture, TaskReport};
use crate::engine::TaskFailure;
use crate::exec::run_shell;

/// Runs a shell command in a fixed working directory.
pub struct CommandTask {
    cmd: String,
    cwd: PathBuf,
}

impl CommandTask {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl TaskBody for CommandTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            info!(cmd = %self.cmd, "running command");
            let out = run_shell(&self.cmd, Some(&self.cwd), None)
                .await
                .map_err(|e| TaskFailure::Io(format!("{e:#}")))?;

            if !out.success {
                return Err(TaskFailure::Command {
                    cmd: self.cmd.clone(),
                    code: out.code,
                    stderr: out.stderr,
                });
            }
            Ok(TaskReport::default())
        })
    }
}
