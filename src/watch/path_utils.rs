// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - Relative paths are taken to be relative to `root` already.
/// - Otherwise we try a direct `strip_prefix(root)`.
/// - If that fails (symlinked roots, `/private/var` on macOS) we canonicalize
///   the root and the path's parent directory and try again; the file itself
///   may no longer exist when the event is a deletion.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if path.is_relative() {
        return Some(slashed(path));
    }

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slashed(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let file_name = path.file_name()?;
    let parent_canon = path.parent()?.canonicalize().ok()?;
    let path_canon = parent_canon.join(file_name);

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(slashed)
}
