// src/collab/notifier.rs

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;

use super::{CollabFuture, ReloadNotifier};
use crate::exec::{expand, run_shell};

/// Logs reload notifications; used when no `[reload].cmd` is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl ReloadNotifier for LogNotifier {
    fn notify<'a>(&'a self, task: &'a str) -> CollabFuture<'a, Result<()>> {
        Box::pin(async move {
            info!(task, "reload");
            Ok(())
        })
    }
}

/// Runs `[reload].cmd` with `{task}` substituted.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    cmd: String,
    cwd: PathBuf,
}

impl CommandNotifier {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl ReloadNotifier for CommandNotifier {
    fn notify<'a>(&'a self, task: &'a str) -> CollabFuture<'a, Result<()>> {
        Box::pin(async move {
            let cmd = expand(&self.cmd, &[("task", task)])?;
            let out = run_shell(&cmd, Some(&self.cwd), None).await?;
            if !out.success {
                bail!("reload command `{cmd}` exited with {}: {}", out.code, out.stderr);
            }
            Ok(())
        })
    }
}
