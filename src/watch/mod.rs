// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` glob patterns into subscriptions.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - (Optionally) content hashing so unchanged files do not trigger re-runs.
//! - The [`WatchController`] that debounces events and schedules re-runs.

use std::path::PathBuf;

use crate::types::ChangeKind;

pub mod controller;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use controller::{WatchController, WatchSummary};
pub use hash::{FileHashStore, HashStore, MemoryHashStore, HASH_FILE_PATH};
pub use patterns::{build_subscriptions, WatchSubscription};
pub use watcher::{spawn_watcher, WatcherHandle};

/// A single filesystem change.
///
/// `path` is either absolute or relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
        }
    }
}
