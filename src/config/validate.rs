// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile, StepConfig, TaskAction, TaskConfig};
use crate::errors::{ForgeError, Result};
use crate::exec::template;
use crate::pipeline::SourceMatcher;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ForgeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Semantic checks that do not need the task graph.
///
/// Dependency resolution and cycles are checked when the graph is built
/// (`tasks::registry::build_graph`), which reports them as graph errors.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task(name, task)?;
    }
    validate_phases(cfg)?;
    validate_watch(cfg)?;
    validate_templates(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> ForgeError {
    ForgeError::ConfigError(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_error(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_in_flight == 0 {
        return Err(config_error("[config].max_in_flight must be >= 1 (got 0)"));
    }
    if cfg.config.source.trim().is_empty() {
        return Err(config_error("[config].source must not be empty"));
    }
    if cfg.config.output.trim().is_empty() {
        return Err(config_error("[config].output must not be empty"));
    }

    let source = Path::new(&cfg.config.source);
    let output = Path::new(&cfg.config.output);
    // Mixed relative/absolute roots are checked by the façade once resolved.
    if source.is_absolute() == output.is_absolute() {
        ensure_disjoint_roots(source, output)?;
    }
    Ok(())
}

/// Reject an output root that is the source root or nested with it either way.
///
/// Cleaning the output root would otherwise delete sources, and pipelines
/// would read their own output. The comparison is lexical.
pub fn ensure_disjoint_roots(source: &Path, output: &Path) -> Result<()> {
    let (s, o) = (normalize(source), normalize(output));
    if s.starts_with(&o) || o.starts_with(&s) {
        return Err(config_error(format!(
            "[config].output ({}) must not overlap [config].source ({})",
            output.display(),
            source.display()
        )));
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// CLI commands that a task name would be shadowed by.
const RESERVED_TASK_NAMES: [&str; 4] = ["build", "deploy", "default", "watch"];

fn validate_task(name: &str, task: &TaskConfig) -> Result<()> {
    if RESERVED_TASK_NAMES.contains(&name) {
        return Err(config_error(format!(
            "task name '{name}' is reserved for the `{name}` command"
        )));
    }

    let action = task.action().ok_or_else(|| {
        config_error(format!(
            "task '{name}' must set exactly one of `src`, `clean` or `cmd`"
        ))
    })?;

    let is_pipeline = matches!(action, TaskAction::Pipeline(_));
    if !is_pipeline
        && (!task.steps.is_empty()
            || task.dest.is_some()
            || !task.exclude.is_empty()
            || task.tolerate_errors)
    {
        return Err(config_error(format!(
            "task '{name}': `steps`, `dest`, `exclude` and `tolerate_errors` only apply to `src` tasks"
        )));
    }

    match action {
        TaskAction::Pipeline(src) => {
            if src.is_empty() {
                return Err(config_error(format!("task '{name}' has an empty `src` list")));
            }
            SourceMatcher::new(src, &task.exclude)
                .map_err(|e| config_error(format!("task '{name}': {e:#}")))?;
            for step in &task.steps {
                validate_step(name, step)?;
            }
        }
        TaskAction::Clean(globs) => {
            if !globs.is_empty() {
                SourceMatcher::new(globs, &[])
                    .map_err(|e| config_error(format!("task '{name}': {e:#}")))?;
            }
        }
        TaskAction::Command(cmd) => {
            if cmd.trim().is_empty() {
                return Err(config_error(format!("task '{name}' has an empty `cmd`")));
            }
        }
    }
    Ok(())
}

fn validate_step(task: &str, step: &StepConfig) -> Result<()> {
    match step {
        StepConfig::Command { cmd } | StepConfig::Check { cmd } => {
            template::check(cmd, &["path"])
                .map_err(|e| config_error(format!("task '{task}': {e}")))?;
        }
        StepConfig::Rename { extension } => {
            if extension.is_empty() || extension.contains(['/', '\\', '.']) {
                return Err(config_error(format!(
                    "task '{task}': invalid rename extension {extension:?}"
                )));
            }
        }
        StepConfig::Concat { output, .. } => {
            if output.trim().is_empty() {
                return Err(config_error(format!("task '{task}': concat needs an `output`")));
            }
        }
        StepConfig::Copy => {}
    }
    Ok(())
}

fn validate_phases(cfg: &RawConfigFile) -> Result<()> {
    for (idx, phase) in cfg.build.phases.iter().enumerate() {
        if phase.is_empty() {
            return Err(config_error(format!("[build].phases[{idx}] is empty")));
        }
        for task in phase {
            if !cfg.task.contains_key(task) {
                return Err(config_error(format!(
                    "[build].phases[{idx}] names unknown task '{task}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    for (idx, watch) in cfg.watch.iter().enumerate() {
        if watch.pattern.is_empty() {
            return Err(config_error(format!("[[watch]] entry {idx} has no `pattern`")));
        }
        if watch.tasks.is_empty() {
            return Err(config_error(format!("[[watch]] entry {idx} has no `tasks`")));
        }
        for task in &watch.tasks {
            if !cfg.task.contains_key(task) {
                return Err(config_error(format!(
                    "[[watch]] entry {idx} names unknown task '{task}'"
                )));
            }
        }
        SourceMatcher::new(&watch.pattern, &watch.exclude)
            .map_err(|e| config_error(format!("[[watch]] entry {idx}: {e:#}")))?;
    }
    Ok(())
}

fn validate_templates(cfg: &RawConfigFile) -> Result<()> {
    if let Some(cmd) = &cfg.serve.cmd {
        template::check(cmd, &["output", "port"]).map_err(|e| config_error(format!("[serve].cmd: {e}")))?;
    }
    if let Some(cmd) = &cfg.reload.cmd {
        template::check(cmd, &["task"]).map_err(|e| config_error(format!("[reload].cmd: {e}")))?;
    }
    if let Some(publish) = &cfg.publish {
        template::check(&publish.cmd, &["output", "host", "project"])
            .map_err(|e| config_error(format!("[publish].cmd: {e}")))?;
    }
    for (name, task) in cfg.task.iter() {
        if let Some(cmd) = &task.cmd {
            template::check(cmd, &[]).map_err(|e| config_error(format!("task '{name}': {e}")))?;
        }
    }
    Ok(())
}
