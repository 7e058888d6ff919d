// src/exec/process.rs

//! Shell command runner.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, or -1 if the process was terminated by a signal.
    pub code: i32,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Build a shell command appropriate for the platform.
fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` through the shell and wait for it to exit.
///
/// When `stdin` is given it is written to the child from a separate task, so
/// large inputs cannot deadlock against a child that fills its stdout pipe.
/// A non-zero exit is not an error here; callers inspect [`CommandOutput`].
pub async fn run_shell(cmd: &str, cwd: Option<&Path>, stdin: Option<Vec<u8>>) -> Result<CommandOutput> {
    let mut command = shell(cmd);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(cmd, "spawning command");
    let mut child = command
        .spawn()
        .with_context(|| format!("spawning `{cmd}`"))?;

    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
            let res = pipe.write_all(&input).await;
            drop(pipe);
            res
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{cmd}`"))?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // The child may exit without draining stdin; its exit code tells the story.
            Ok(Err(err)) => debug!(cmd, error = %err, "stdin write did not complete"),
            Err(err) => warn!(cmd, error = %err, "stdin writer task failed"),
        }
    }

    let code = output.status.code().unwrap_or(-1);
    debug!(cmd, exit_code = code, success = output.status.success(), "command exited");

    Ok(CommandOutput {
        code,
        success: output.status.success(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    })
}
