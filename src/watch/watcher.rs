// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::info;

use crate::types::ChangeKind;
use crate::watch::WatchEvent;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching and close
/// the event channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Map a notify event kind to the changes the controller cares about.
///
/// Access and metadata-only events are ignored.
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Any | EventKind::Other => Some(ChangeKind::Modified),
        EventKind::Access(_) => None,
    }
}

/// Watch `root` recursively and forward changes as [`WatchEvent`]s.
///
/// Event paths are absolute; the controller relativizes them.
pub fn spawn_watcher(root: impl Into<PathBuf>, tx: mpsc::UnboundedSender<WatchEvent>) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or(root);

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = change_kind(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    if tx.send(WatchEvent { path, kind }).is_err() {
                        // Controller has shut down.
                        return;
                    }
                }
            }
            Err(err) => {
                // Called on notify's thread; tracing still works from here.
                tracing::warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "file watcher started");

    Ok(WatcherHandle { _inner: watcher })
}
