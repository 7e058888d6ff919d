// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::pipeline::SourceMatcher;

/// A compiled `[[watch]]` entry: which paths trigger which tasks.
///
/// Paths are matched relative to the source root.
#[derive(Clone)]
pub struct WatchSubscription {
    matcher: SourceMatcher,
    tasks: Vec<TaskName>,
    use_hash: bool,
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("patterns", &self.matcher.patterns())
            .field("tasks", &self.tasks)
            .field("use_hash", &self.use_hash)
            .finish()
    }
}

impl WatchSubscription {
    pub fn new(include: &[String], exclude: &[String], tasks: Vec<TaskName>, use_hash: bool) -> Result<Self> {
        let matcher = SourceMatcher::new(include, exclude)
            .with_context(|| format!("building watch patterns for tasks {:?}", tasks))?;
        Ok(Self {
            matcher,
            tasks,
            use_hash,
        })
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn matcher(&self) -> &SourceMatcher {
        &self.matcher
    }

    /// Returns true if `rel_path` (relative to the source root) is watched.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.matches(rel_path)
    }

    /// Stable identity used as the hash store key.
    pub fn key(&self) -> String {
        format!("{}|{}", self.tasks.join(","), self.matcher.patterns().join(","))
    }
}

/// Compile every `[[watch]]` entry of a loaded configuration.
pub fn build_subscriptions(cfg: &ConfigFile) -> Result<Vec<WatchSubscription>> {
    cfg.watch
        .iter()
        .map(|w| WatchSubscription::new(&w.pattern, &w.exclude, w.tasks.clone(), w.use_hash))
        .collect()
}
