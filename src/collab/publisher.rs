// src/collab/publisher.rs

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::info;

use super::{CollabFuture, PublishError, PublishTarget, Publisher};
use crate::exec::{expand, run_shell};

/// Runs `[publish].cmd` with `{output}`, `{host}` and `{project}` substituted.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    cmd: String,
    cwd: PathBuf,
}

impl CommandPublisher {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }

    async fn publish_inner(&self, output: &Path, target: &PublishTarget) -> anyhow::Result<()> {
        let output = output.to_string_lossy();
        let cmd = expand(
            &self.cmd,
            &[
                ("output", &*output),
                ("host", target.host.as_str()),
                ("project", target.project.as_str()),
            ],
        )?;

        info!(%target, "publishing output tree");
        let out = run_shell(&cmd, Some(&self.cwd), None).await?;
        if !out.success {
            return Err(anyhow!(
                "publish command `{cmd}` exited with {}: {}",
                out.code,
                out.stderr
            ));
        }
        Ok(())
    }
}

impl Publisher for CommandPublisher {
    fn publish<'a>(
        &'a self,
        output: &'a Path,
        target: &'a PublishTarget,
    ) -> CollabFuture<'a, Result<(), PublishError>> {
        Box::pin(async move {
            self.publish_inner(output, target)
                .await
                .map_err(|source| PublishError {
                    target: target.clone(),
                    source,
                })
        })
    }
}
