// src/tasks/pipeline.rs

use std::sync::Arc;

use tracing::warn;

use crate::dag::{TaskBody, TaskFuture, TaskReport};
use crate::engine::TaskFailure;
use crate::pipeline::{FilePipeline, PipelineSpec};

/// Task body that runs one [`PipelineSpec`].
///
/// Any per-file error fails the task unless `tolerate_errors` is set, in
/// which case errors are only logged.
pub struct PipelineTask {
    pipeline: Arc<FilePipeline>,
    spec: PipelineSpec,
    tolerate_errors: bool,
}

impl PipelineTask {
    pub fn new(pipeline: Arc<FilePipeline>, spec: PipelineSpec) -> Self {
        Self {
            pipeline,
            spec,
            tolerate_errors: false,
        }
    }

    pub fn tolerate_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_errors = tolerate;
        self
    }
}

impl TaskBody for PipelineTask {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            let outcome = self.pipeline.run(&self.spec).await;

            if !outcome.errors.is_empty() {
                if !self.tolerate_errors {
                    return Err(TaskFailure::Transforms(outcome.errors));
                }
                for err in &outcome.errors {
                    warn!(path = %err.path.display(), step = %err.step, error = %err.message, "tolerated file error");
                }
            }

            Ok(TaskReport {
                written: outcome.written,
            })
        })
    }
}
