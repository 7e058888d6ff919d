use std::str::FromStr;

use serde::Deserialize;

/// Where watch subscriptions with `use_hash = true` remember content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store hashes in a file (`<source>/.taskforge/hashes`).
    File,
    /// Store hashes in memory only (lost on restart).
    #[default]
    Memory,
}

impl FromStr for HashStorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(HashStorageMode::File),
            "memory" => Ok(HashStorageMode::Memory),
            other => Err(format!(
                "invalid hash_storage_mode: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}

/// Kind of filesystem change reported by the watch source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}
