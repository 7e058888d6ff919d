// src/pipeline/record.rs

use std::path::{Path, PathBuf};

/// One file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the source root (and, once written, to the destination).
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Same contents under a different extension.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.path.set_extension(extension);
        self
    }

    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = contents.into();
        self
    }
}
