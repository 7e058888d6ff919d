// src/pipeline/transform.rs

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use super::FileRecord;

/// A single file failed at one step of a pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {step}: {message}", .path.display())]
pub struct TransformError {
    pub path: PathBuf,
    pub step: String,
    pub message: String,
}

impl TransformError {
    pub fn new(path: impl AsRef<Path>, step: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            step: step.into(),
            message: message.to_string(),
        }
    }
}

/// Per-record result: a new record, `None` to drop the file, or an error.
pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<FileRecord>, TransformError>> + Send + 'a>>;

/// A per-file pipeline step.
pub trait Transform: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn apply(&self, record: FileRecord) -> TransformFuture<'_>;
}

/// An aggregating pipeline step: all surviving records, sorted by path, in;
/// one record out.
pub trait Aggregate: Send + Sync {
    fn name(&self) -> &str;

    /// Path of the combined record, used to name errors when the merge cannot run.
    fn output(&self) -> &Path;

    fn combine(&self, records: Vec<FileRecord>) -> Result<FileRecord, TransformError>;
}

#[derive(Clone)]
pub enum Step {
    Map(Arc<dyn Transform>),
    Merge(Arc<dyn Aggregate>),
}

impl Step {
    pub fn map(transform: impl Transform + 'static) -> Self {
        Step::Map(Arc::new(transform))
    }

    pub fn merge(aggregate: impl Aggregate + 'static) -> Self {
        Step::Merge(Arc::new(aggregate))
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Map(t) => t.name(),
            Step::Merge(a) => a.name(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Map(t) => write!(f, "Map({})", t.name()),
            Step::Merge(a) => write!(f, "Merge({})", a.name()),
        }
    }
}
