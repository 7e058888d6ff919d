// src/pipeline/matcher.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::watch::hash::STATE_DIR;

/// Compiled include/exclude globs, matched against paths relative to a root.
///
/// `*` does not cross `/`; use `**` to match any depth. Paths under the
/// engine's own state directory never match.
#[derive(Clone)]
pub struct SourceMatcher {
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for SourceMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMatcher")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl SourceMatcher {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include).context("building include globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self {
            patterns: include.to_vec(),
            include: include_set,
            exclude: exclude_set,
        })
    }

    /// Include patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `rel_path` uses forward slashes, e.g. `"js/app.js"`.
    pub fn matches(&self, rel_path: &str) -> bool {
        if rel_path == STATE_DIR || rel_path.starts_with(&format!("{STATE_DIR}/")) {
            return false;
        }
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` accepted by `matcher`.
///
/// Returns paths relative to `root`, sorted.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &SourceMatcher,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                if path.file_name().is_some_and(|n| n == STATE_DIR) && dir == root {
                    continue;
                }
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if matcher.matches(&rel_str) {
                        files.push(rel.to_path_buf());
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
