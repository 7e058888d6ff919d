// src/watch/hash.rs

//! Content hashing for `use_hash` watch subscriptions.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Directory under the source root where the engine keeps its own state.
pub const STATE_DIR: &str = ".taskforge";

/// Relative path (from the source root) to the hashes file.
pub const HASH_FILE_PATH: &str = ".taskforge/hashes";

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Deterministic hash over a set of files below `root`.
///
/// Each file contributes its relative path and content hash, so renames and
/// deletions change the result as well as edits. Input order does not matter.
pub fn compute_aggregate_hash(fs: &dyn FileSystem, root: &Path, rel_paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = rel_paths.iter().collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for rel in sorted {
        let file_hash = compute_file_hash(fs, &root.join(rel))?;
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(file_hash.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = rel_paths.len(), "computed aggregate hash");
    Ok(hash)
}

/// Abstract storage for subscription hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, hash: &str) -> Result<()>;
    /// Remove hashes whose key is not in `active`.
    fn prune(&mut self, active: &[&str]) -> Result<()>;
}

/// Stores hashes in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        self.map.insert(key.to_string(), hash.to_string());
        debug!(key, hash, "stored hash (memory)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        let initial_len = self.map.len();
        self.map.retain(|k, _| active.contains(&k.as_str()));
        if self.map.len() < initial_len {
            info!(removed = initial_len - self.map.len(), "pruned stale hashes (memory)");
        }
        Ok(())
    }
}

/// Stores hashes in `<root>/.taskforge/hashes`, one `key<TAB>hash` per line.
#[derive(Debug)]
pub struct FileHashStore {
    path: PathBuf,
    fs: std::sync::Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: &Path, fs: std::sync::Arc<dyn FileSystem>) -> Self {
        Self {
            path: root.join(HASH_FILE_PATH),
            fs,
        }
    }

    fn load_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.fs.exists(&self.path) {
            return Ok(BTreeMap::new());
        }
        let bytes = self
            .fs
            .read(&self.path)
            .with_context(|| format!("reading hash file at {:?}", self.path))?;
        let text = String::from_utf8_lossy(&bytes);

        Ok(text
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect())
    }

    fn save_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let mut out = String::new();
        for (key, hash) in map {
            out.push_str(key);
            out.push('\t');
            out.push_str(hash);
            out.push('\n');
        }
        self.fs
            .write(&self.path, out.as_bytes())
            .with_context(|| format!("writing hash file at {:?}", self.path))
    }
}

impl HashStore for FileHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(key.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(key, hash, "stored hash (file)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        let mut map = self.load_all()?;
        let initial_len = map.len();
        map.retain(|k, _| active.contains(&k.as_str()));
        if map.len() < initial_len {
            self.save_all(&map)?;
            info!(removed = initial_len - map.len(), "pruned stale hashes (file)");
        }
        Ok(())
    }
}
