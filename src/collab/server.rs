// src/collab/server.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::info;

use super::{CollabFuture, StaticServer};
use crate::exec::{expand, run_shell};

/// Runs `[serve].cmd` with `{output}` and `{port}` substituted.
///
/// The command is expected to stay in the foreground; it is killed when the
/// returned future is dropped.
#[derive(Debug, Clone)]
pub struct CommandServer {
    cmd: String,
    cwd: PathBuf,
}

impl CommandServer {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl StaticServer for CommandServer {
    fn serve<'a>(&'a self, root: &'a Path, port: u16) -> CollabFuture<'a, Result<()>> {
        Box::pin(async move {
            let output = root.to_string_lossy();
            let port = port.to_string();
            let cmd = expand(&self.cmd, &[("output", &*output), ("port", port.as_str())])?;

            info!(root = %root.display(), port = %port, "starting static server");
            let out = run_shell(&cmd, Some(&self.cwd), None).await?;
            if !out.success {
                bail!("server command `{cmd}` exited with {}: {}", out.code, out.stderr);
            }
            info!("static server exited");
            Ok(())
        })
    }
}
