// src/pipeline/mod.rs

//! Streaming file transformation pipeline.
//!
//! A pipeline run enumerates the files matched under the source root, pushes
//! each through the per-file transforms concurrently (bounded by a
//! semaphore), stops at merge steps until every file has arrived, and writes
//! whatever survives under the destination directory.
//!
//! Per-file failures are collected; they never stop the other files.

pub mod builtin;
pub mod matcher;
pub mod record;
pub mod transform;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, warn};

use crate::fs::FileSystem;

pub use builtin::{CheckTransform, CommandTransform, Concat, CopyFile, Rename};
pub use matcher::{collect_matching_files, SourceMatcher};
pub use record::FileRecord;
pub use transform::{Aggregate, Step, Transform, TransformError, TransformFuture};

/// What one pipeline run should do.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub matcher: SourceMatcher,
    pub steps: Vec<Step>,
    /// Output directory. `None` makes the pipeline check-only.
    pub destination: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Number of source files matched.
    pub matched: usize,
    /// Output files written, sorted.
    pub written: Vec<PathBuf>,
    pub errors: Vec<TransformError>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A record still to be read from disk, or already in memory.
enum Input {
    Source(PathBuf),
    Loaded(FileRecord),
}

impl Input {
    fn path(&self) -> &Path {
        match self {
            Input::Source(p) => p,
            Input::Loaded(r) => &r.path,
        }
    }
}

/// Runs [`PipelineSpec`]s against one source root.
#[derive(Debug, Clone)]
pub struct FilePipeline {
    fs: Arc<dyn FileSystem>,
    source_root: PathBuf,
    max_in_flight: usize,
}

impl FilePipeline {
    pub fn new(fs: Arc<dyn FileSystem>, source_root: impl Into<PathBuf>, max_in_flight: usize) -> Self {
        Self {
            fs,
            source_root: source_root.into(),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub async fn run(&self, spec: &PipelineSpec) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::default();

        let files = match self.enumerate(&spec.matcher).await {
            Ok(files) => files,
            Err(err) => {
                outcome
                    .errors
                    .push(TransformError::new(&self.source_root, "enumerate", format!("{err:#}")));
                return outcome;
            }
        };
        outcome.matched = files.len();
        debug!(
            root = %self.source_root.display(),
            patterns = ?spec.matcher.patterns(),
            matched = files.len(),
            "pipeline matched files"
        );

        let mut current: Vec<Input> = files.into_iter().map(Input::Source).collect();
        let mut pending_maps: Vec<Arc<dyn Transform>> = Vec::new();

        for step in &spec.steps {
            match step {
                Step::Map(t) => pending_maps.push(Arc::clone(t)),
                Step::Merge(aggregate) => {
                    let maps = std::mem::take(&mut pending_maps);
                    let mut records = self.map_all(current, maps, &mut outcome.errors).await;

                    if !outcome.errors.is_empty() {
                        warn!(output = %aggregate.output().display(), "inputs failed; merge skipped");
                        outcome.errors.push(TransformError::new(
                            aggregate.output(),
                            aggregate.name(),
                            "not produced because one or more inputs failed",
                        ));
                        current = Vec::new();
                        continue;
                    }

                    records.sort_by(|a, b| a.path.cmp(&b.path));
                    current = match aggregate.combine(records) {
                        Ok(merged) => vec![Input::Loaded(merged)],
                        Err(err) => {
                            outcome.errors.push(err);
                            Vec::new()
                        }
                    };
                }
            }
        }

        let mut records = self.map_all(current, pending_maps, &mut outcome.errors).await;
        records.sort_by(|a, b| a.path.cmp(&b.path));

        if let Some(dest) = &spec.destination {
            outcome.written = self.write_all(dest, records, &mut outcome.errors).await;
        }

        info!(
            matched = outcome.matched,
            written = outcome.written.len(),
            errors = outcome.errors.len(),
            "pipeline finished"
        );
        outcome
    }

    async fn enumerate(&self, matcher: &SourceMatcher) -> anyhow::Result<Vec<PathBuf>> {
        let fs = Arc::clone(&self.fs);
        let root = self.source_root.clone();
        let matcher = matcher.clone();
        tokio::task::spawn_blocking(move || collect_matching_files(fs.as_ref(), &root, &matcher))
            .await?
    }

    /// Push every input through `maps`, at most `max_in_flight` at a time.
    ///
    /// Survivors come back in input order; failures are appended to `errors`.
    async fn map_all(
        &self,
        inputs: Vec<Input>,
        maps: Vec<Arc<dyn Transform>>,
        errors: &mut Vec<TransformError>,
    ) -> Vec<FileRecord> {
        let maps = Arc::new(maps);
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut set = JoinSet::new();
        let mut paths: HashMap<Id, (usize, PathBuf)> = HashMap::new();
        let total = inputs.len();

        for (idx, input) in inputs.into_iter().enumerate() {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let path = input.path().to_path_buf();
            let fs = Arc::clone(&self.fs);
            let root = self.source_root.clone();
            let maps = Arc::clone(&maps);

            let handle = set.spawn(async move {
                let result = process_one(fs, &root, input, &maps).await;
                drop(permit);
                result
            });
            paths.insert(handle.id(), (idx, path));
        }

        let mut results: Vec<Option<Result<Option<FileRecord>, TransformError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some((idx, _)) = paths.remove(&id) {
                        results[idx] = Some(result);
                    }
                }
                Err(err) => {
                    if let Some((idx, path)) = paths.remove(&err.id()) {
                        results[idx] = Some(Err(TransformError::new(path, "transform", err)));
                    }
                }
            }
        }

        let mut survivors = Vec::new();
        for result in results.into_iter().flatten() {
            match result {
                Ok(Some(record)) => survivors.push(record),
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %err.path.display(), step = %err.step, error = %err.message, "file failed");
                    errors.push(err);
                }
            }
        }
        survivors
    }

    async fn write_all(
        &self,
        dest: &Path,
        records: Vec<FileRecord>,
        errors: &mut Vec<TransformError>,
    ) -> Vec<PathBuf> {
        let fs = Arc::clone(&self.fs);
        let dest = dest.to_path_buf();

        let joined = tokio::task::spawn_blocking(move || {
            let mut written = Vec::new();
            let mut failed = Vec::new();
            for record in records {
                let target = dest.join(&record.path);
                match fs.write(&target, &record.contents) {
                    Ok(()) => written.push(target),
                    Err(err) => failed.push(TransformError::new(&record.path, "write", format!("{err:#}"))),
                }
            }
            (written, failed)
        })
        .await;

        match joined {
            Ok((written, failed)) => {
                errors.extend(failed);
                written
            }
            Err(err) => {
                errors.push(TransformError::new(&self.source_root, "write", err));
                Vec::new()
            }
        }
    }
}

async fn process_one(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    input: Input,
    maps: &[Arc<dyn Transform>],
) -> Result<Option<FileRecord>, TransformError> {
    let mut record = match input {
        Input::Loaded(record) => record,
        Input::Source(rel) => {
            let full = root.join(&rel);
            let contents = tokio::task::spawn_blocking(move || fs.read(&full))
                .await
                .map_err(|e| TransformError::new(&rel, "read", e))?
                .map_err(|e| TransformError::new(&rel, "read", format!("{e:#}")))?;
            FileRecord::new(rel, contents)
        }
    };

    for transform in maps {
        match transform.apply(record).await? {
            Some(next) => record = next,
            None => {
                debug!(step = transform.name(), "file dropped by transform");
                return Ok(None);
            }
        }
    }
    Ok(Some(record))
}
