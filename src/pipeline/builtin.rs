// src/pipeline/builtin.rs

//! Built-in pipeline steps.
//!
//! Compilers and minifiers are external programs: [`CommandTransform`] pipes
//! a file through one, [`CheckTransform`] only inspects it. The rest are
//! pure byte manipulations.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Aggregate, FileRecord, Transform, TransformError, TransformFuture};
use crate::exec::{expand, run_shell};

/// Passes records through unchanged.
#[derive(Debug, Clone, Default)]
pub struct CopyFile;

impl Transform for CopyFile {
    fn name(&self) -> &str {
        "copy"
    }

    fn apply(&self, record: FileRecord) -> TransformFuture<'_> {
        Box::pin(async move { Ok(Some(record)) })
    }
}

/// Changes the extension of the record's path.
#[derive(Debug, Clone)]
pub struct Rename {
    extension: String,
}

impl Rename {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Transform for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn apply(&self, record: FileRecord) -> TransformFuture<'_> {
        Box::pin(async move { Ok(Some(record.with_extension(&self.extension))) })
    }
}

/// Runs a shell command with the file on stdin; stdout becomes the new contents.
///
/// `{path}` in the command expands to the record's relative path.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    cmd: String,
    cwd: PathBuf,
}

impl CommandTransform {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.cmd
    }

    fn apply(&self, record: FileRecord) -> TransformFuture<'_> {
        Box::pin(async move {
            let stdout = pipe_through(&self.cmd, &self.cwd, &record).await?;
            Ok(Some(record.with_contents(stdout)))
        })
    }
}

/// Runs a shell command with the file on stdin and keeps the record as is.
///
/// Used for linting: a non-zero exit fails the file.
#[derive(Debug, Clone)]
pub struct CheckTransform {
    cmd: String,
    cwd: PathBuf,
}

impl CheckTransform {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl Transform for CheckTransform {
    fn name(&self) -> &str {
        &self.cmd
    }

    fn apply(&self, record: FileRecord) -> TransformFuture<'_> {
        Box::pin(async move {
            pipe_through(&self.cmd, &self.cwd, &record).await?;
            Ok(Some(record))
        })
    }
}

async fn pipe_through(cmd: &str, cwd: &Path, record: &FileRecord) -> Result<Vec<u8>, TransformError> {
    let path = record.path.to_string_lossy().replace('\\', "/");
    let cmd_line = expand(cmd, &[("path", path.as_str())])
        .map_err(|e| TransformError::new(&record.path, cmd, e))?;

    debug!(path = %path, cmd = %cmd_line, "piping file through command");
    let out = run_shell(&cmd_line, Some(cwd), Some(record.contents.clone()))
        .await
        .map_err(|e| TransformError::new(&record.path, cmd, format!("{e:#}")))?;

    if !out.success {
        let message = if out.stderr.is_empty() {
            format!("exited with code {}", out.code)
        } else {
            format!("exited with code {}: {}", out.code, out.stderr)
        };
        return Err(TransformError::new(&record.path, cmd, message));
    }
    Ok(out.stdout)
}

/// Concatenates all records into `output`, joined by `separator`.
#[derive(Debug, Clone)]
pub struct Concat {
    output: PathBuf,
    separator: Vec<u8>,
}

impl Concat {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            separator: b"\n".to_vec(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<Vec<u8>>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl Aggregate for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn output(&self) -> &Path {
        &self.output
    }

    fn combine(&self, records: Vec<FileRecord>) -> Result<FileRecord, TransformError> {
        let mut contents = Vec::new();
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                contents.extend_from_slice(&self.separator);
            }
            contents.extend_from_slice(&record.contents);
        }
        Ok(FileRecord::new(self.output.clone(), contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rename_changes_extension_only() {
        let out = Rename::new("css")
            .apply(FileRecord::new("styles/main.less", "a {}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, FileRecord::new("styles/main.css", "a {}"));
    }

    #[test]
    fn concat_joins_with_separator() {
        let merged = Concat::new("bundle.js")
            .with_separator(";\n")
            .combine(vec![FileRecord::new("a.js", "a"), FileRecord::new("b.js", "b")])
            .unwrap();
        assert_eq!(merged, FileRecord::new("bundle.js", "a;\nb"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let t = CommandTransform::new("cat >/dev/null; echo 'parse error' >&2; exit 1", dir.path());

        let err = t.apply(FileRecord::new("bad.less", "{")).await.unwrap_err();
        assert_eq!(err.path, PathBuf::from("bad.less"));
        assert!(err.message.contains("parse error"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn check_passes_record_through() {
        let dir = tempfile::tempdir().unwrap();
        let t = CheckTransform::new("grep -q strict", dir.path());

        let rec = FileRecord::new("app.js", "'use strict';");
        assert_eq!(t.apply(rec.clone()).await.unwrap(), Some(rec));

        let err = t.apply(FileRecord::new("sloppy.js", "x = 1")).await.unwrap_err();
        assert_eq!(err.message, "exited with code 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn path_reaches_the_command_as_one_argument() {
        let dir = tempfile::tempdir().unwrap();
        let t = CommandTransform::new("cat >/dev/null; printf %s {path}", dir.path());

        for name in ["pages/a b.js", "$(echo injected).js", "it's `x`;.js"] {
            let out = t.apply(FileRecord::new(name, "")).await.unwrap().unwrap();
            assert_eq!(out.contents, name.as_bytes(), "path {name:?}");
        }
    }
}
