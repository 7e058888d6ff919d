// src/tasks/registry.rs

//! Build the task graph from configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, StepConfig, TaskAction, TaskConfig};
use crate::dag::{Task, TaskBody, TaskGraph};
use crate::errors::{ForgeError, Result};
use crate::fs::FileSystem;
use crate::pipeline::{
    CheckTransform, CommandTransform, Concat, CopyFile, FilePipeline, PipelineSpec, Rename,
    SourceMatcher, Step,
};
use crate::tasks::{CleanTask, CommandTask, PipelineTask};

/// Everything task bodies need from the environment.
#[derive(Debug, Clone)]
pub struct BuildEnv {
    pub fs: Arc<dyn FileSystem>,
    /// Directory containing the config file; commands run here.
    pub config_dir: PathBuf,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub max_in_flight: usize,
}

impl BuildEnv {
    /// Resolve `[config].source` / `.output` against `config_dir`.
    pub fn from_config(cfg: &ConfigFile, config_dir: &Path, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            config_dir: config_dir.to_path_buf(),
            source_root: config_dir.join(&cfg.config.source),
            output_root: config_dir.join(&cfg.config.output),
            max_in_flight: cfg.config.max_in_flight,
        }
    }
}

/// Register every configured task, in file order, and validate the graph.
///
/// No task body runs and no file is touched here.
pub fn build_graph(cfg: &ConfigFile, env: &BuildEnv) -> Result<TaskGraph> {
    let pipeline = Arc::new(FilePipeline::new(
        Arc::clone(&env.fs),
        env.source_root.clone(),
        env.max_in_flight,
    ));

    let mut graph = TaskGraph::new();
    for (name, task_cfg) in cfg.tasks() {
        let body = task_body(name, task_cfg, env, &pipeline)?;
        let deps: Vec<&str> = task_cfg.after.iter().map(String::as_str).collect();
        graph.register_task(Task::new(name.as_str(), &deps, body).with_reload(task_cfg.reload))?;
        debug!(task = %name, deps = ?task_cfg.after, "registered task");
    }

    graph.validate()?;
    Ok(graph)
}

fn task_body(
    name: &str,
    task: &TaskConfig,
    env: &BuildEnv,
    pipeline: &Arc<FilePipeline>,
) -> Result<Arc<dyn TaskBody>> {
    let action = task.action().ok_or_else(|| {
        ForgeError::ConfigError(format!(
            "task '{name}' must set exactly one of `src`, `clean` or `cmd`"
        ))
    })?;

    let body: Arc<dyn TaskBody> = match action {
        TaskAction::Pipeline(src) => {
            let spec = PipelineSpec {
                matcher: SourceMatcher::new(src, &task.exclude)?,
                steps: task.steps.iter().map(|s| build_step(s, env)).collect(),
                destination: task.dest.as_ref().map(|d| env.output_root.join(d)),
            };
            Arc::new(PipelineTask::new(Arc::clone(pipeline), spec).tolerate_errors(task.tolerate_errors))
        }
        TaskAction::Clean(globs) if globs.is_empty() => {
            Arc::new(CleanTask::wipe(Arc::clone(&env.fs), env.output_root.clone()))
        }
        TaskAction::Clean(globs) => Arc::new(CleanTask::matching(
            Arc::clone(&env.fs),
            env.output_root.clone(),
            SourceMatcher::new(globs, &[])?,
        )),
        TaskAction::Command(cmd) => Arc::new(CommandTask::new(cmd, env.config_dir.clone())),
    };
    Ok(body)
}

fn build_step(step: &StepConfig, env: &BuildEnv) -> Step {
    match step {
        StepConfig::Command { cmd } => Step::map(CommandTransform::new(cmd, env.config_dir.clone())),
        StepConfig::Check { cmd } => Step::map(CheckTransform::new(cmd, env.config_dir.clone())),
        StepConfig::Rename { extension } => Step::map(Rename::new(extension)),
        StepConfig::Concat { output, separator } => {
            Step::merge(Concat::new(output).with_separator(separator.as_bytes()))
        }
        StepConfig::Copy => Step::map(CopyFile),
    }
}
