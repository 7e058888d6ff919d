// src/tasks/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::dag::{TaskBody, TaskFuture, TaskReport};
use crate::engine::TaskFailure;
use crate::fs::FileSystem;
use crate::pipeline::{collect_matching_files, SourceMatcher};

/// Deletes generated files under the output root.
///
/// Without patterns the whole output root is removed and recreated empty.
/// With patterns only matching files are removed; a missing output root is
/// not an error.
pub struct CleanTask {
    fs: Arc<dyn FileSystem>,
    output_root: PathBuf,
    patterns: Option<SourceMatcher>,
}

impl CleanTask {
    pub fn wipe(fs: Arc<dyn FileSystem>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_root: output_root.into(),
            patterns: None,
        }
    }

    pub fn matching(fs: Arc<dyn FileSystem>, output_root: impl Into<PathBuf>, patterns: SourceMatcher) -> Self {
        Self {
            fs,
            output_root: output_root.into(),
            patterns: Some(patterns),
        }
    }
}

fn clean(fs: &dyn FileSystem, root: &std::path::Path, patterns: Option<&SourceMatcher>) -> Result<usize> {
    match patterns {
        None => {
            fs.remove_dir_all(root)?;
            fs.create_dir_all(root)?;
            Ok(0)
        }
        Some(matcher) => {
            if !fs.is_dir(root) {
                return Ok(0);
            }
            let files = collect_matching_files(fs, root, matcher)?;
            for rel in &files {
                debug!(path = %rel.display(), "removing");
                fs.remove_file(&root.join(rel))?;
            }
            Ok(files.len())
        }
    }
}

impl TaskBody for CleanTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            let fs = Arc::clone(&self.fs);
            let root = self.output_root.clone();
            let patterns = self.patterns.clone();

            let removed = tokio::task::spawn_blocking(move || clean(fs.as_ref(), &root, patterns.as_ref()))
                .await
                .map_err(|e| TaskFailure::Io(e.to_string()))?
                .map_err(|e| TaskFailure::Io(format!("{e:#}")))?;

            info!(root = %self.output_root.display(), removed, "clean finished");
            Ok(TaskReport::default())
        })
    }
}
