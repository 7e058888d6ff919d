// src/facade.rs

//! Top-level commands: `build`, `deploy`, `default`, `watch` and running a
//! single task by name.
//!
//! [`BuildFacade`] owns the scheduler and the collaborators and is built
//! once from a validated configuration.

use std::fmt::{self, Write as _};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::collab::{
    CommandNotifier, CommandPublisher, CommandServer, LogNotifier, PublishTarget, Publisher,
    ReloadNotifier, StaticServer,
};
use crate::config::model::{default_phases, ConfigFile};
use crate::config::validate::ensure_disjoint_roots;
use crate::dag::ExecutionPlan;
use crate::engine::{RunOutcome, Scheduler, TaskName};
use crate::errors::{DeployError, ForgeError, GraphError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::tasks::outputs::find_overlaps;
use crate::tasks::{build_graph, BuildEnv};
use crate::types::HashStorageMode;
use crate::watch::{
    build_subscriptions, spawn_watcher, FileHashStore, HashStore, MemoryHashStore,
    WatchController, WatchSubscription, WatchSummary,
};

/// A CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build,
    Deploy,
    /// Build, then watch and serve until Ctrl-C.
    Default,
    Watch,
    /// Any configured task, with its dependencies.
    Task(TaskName),
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "build" => Command::Build,
            "deploy" => Command::Deploy,
            "default" => Command::Default,
            "watch" => Command::Watch,
            other => Command::Task(other.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Build => f.write_str("build"),
            Command::Deploy => f.write_str("deploy"),
            Command::Default => f.write_str("default"),
            Command::Watch => f.write_str("watch"),
            Command::Task(name) => f.write_str(name),
        }
    }
}

/// Outcomes of the build phases that ran, in order.
///
/// Phases after a failed one are not run.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub phases: Vec<RunOutcome>,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.phases.iter().all(RunOutcome::is_success)
    }

    pub fn failed_phase(&self) -> Option<&RunOutcome> {
        self.phases.iter().find(|p| !p.is_success())
    }

    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.phases.iter().flat_map(|p| p.written.iter().map(PathBuf::as_path))
    }

    pub fn describe_failures(&self) -> String {
        self.phases
            .iter()
            .map(RunOutcome::describe_failures)
            .collect()
    }
}

/// What `default` did before it was stopped.
#[derive(Debug, Clone)]
pub struct DevelopOutcome {
    pub build: BuildOutcome,
    pub watch: WatchSummary,
}

pub struct BuildFacade {
    scheduler: Arc<Scheduler>,
    fs: Arc<dyn FileSystem>,
    source_root: PathBuf,
    output_root: PathBuf,
    phases: Vec<Vec<TaskName>>,
    subscriptions: Vec<WatchSubscription>,
    debounce: Duration,
    hash_storage_mode: HashStorageMode,
    publisher: Option<(Arc<dyn Publisher>, PublishTarget)>,
    server: Option<(Arc<dyn StaticServer>, u16)>,
}

impl BuildFacade {
    /// A façade with the default build phases and no watch subscriptions,
    /// publisher or server.
    pub fn new(
        scheduler: Arc<Scheduler>,
        fs: Arc<dyn FileSystem>,
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scheduler,
            fs,
            source_root: source_root.into(),
            output_root: output_root.into(),
            phases: default_phases(),
            subscriptions: Vec::new(),
            debounce: Duration::from_millis(150),
            hash_storage_mode: HashStorageMode::default(),
            publisher: None,
            server: None,
        }
    }

    /// Build everything from a validated configuration, using the real
    /// filesystem and the configured collaborators.
    pub fn from_config(cfg: &ConfigFile, config_dir: &Path) -> crate::errors::Result<Self> {
        let notifier: Arc<dyn ReloadNotifier> = match &cfg.reload.cmd {
            Some(cmd) => Arc::new(CommandNotifier::new(cmd, config_dir)),
            None => Arc::new(LogNotifier),
        };
        let mut facade = Self::from_config_with(cfg, config_dir, Arc::new(RealFileSystem), notifier)?;

        if let Some(publish) = &cfg.publish {
            let target = PublishTarget {
                host: publish.host.clone(),
                project: publish.project.clone(),
            };
            facade = facade.with_publisher(Arc::new(CommandPublisher::new(&publish.cmd, config_dir)), target);
        }
        if let Some(cmd) = &cfg.serve.cmd {
            facade = facade.with_server(Arc::new(CommandServer::new(cmd, config_dir)), cfg.serve.port);
        }
        Ok(facade)
    }

    /// Like [`BuildFacade::from_config`] but with an explicit filesystem and
    /// reload notifier, and without publisher or server.
    ///
    /// Fails if the graph is invalid or if tasks that run concurrently in a
    /// build phase declare overlapping outputs.
    pub fn from_config_with(
        cfg: &ConfigFile,
        config_dir: &Path,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn ReloadNotifier>,
    ) -> crate::errors::Result<Self> {
        let env = BuildEnv::from_config(cfg, config_dir, fs);
        ensure_disjoint_roots(&env.source_root, &env.output_root)?;
        let graph = build_graph(cfg, &env)?;

        let overlaps = find_overlaps(cfg, &graph)?;
        if !overlaps.is_empty() {
            let lines: Vec<String> = overlaps.iter().map(ToString::to_string).collect();
            return Err(ForgeError::ConfigError(lines.join("; ")));
        }

        let subscriptions = build_subscriptions(cfg)?;
        let scheduler = Arc::new(Scheduler::new(Arc::new(graph), notifier));

        info!(
            tasks = scheduler.graph().len(),
            source = %env.source_root.display(),
            output = %env.output_root.display(),
            "task graph ready"
        );

        Ok(Self {
            scheduler,
            fs: env.fs,
            source_root: env.source_root,
            output_root: env.output_root,
            phases: cfg.build.phases.clone(),
            subscriptions,
            debounce: Duration::from_millis(cfg.config.debounce_ms),
            hash_storage_mode: cfg.config.hash_storage_mode,
            publisher: None,
            server: None,
        })
    }

    pub fn with_phases(mut self, phases: Vec<Vec<TaskName>>) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_subscriptions(mut self, subscriptions: Vec<WatchSubscription>) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>, target: PublishTarget) -> Self {
        self.publisher = Some((publisher, target));
        self
    }

    pub fn with_server(mut self, server: Arc<dyn StaticServer>, port: u16) -> Self {
        self.server = Some((server, port));
        self
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn subscriptions(&self) -> &[WatchSubscription] {
        &self.subscriptions
    }

    /// Run every build phase in order, stopping after the first failed one.
    pub async fn build(&self) -> Result<BuildOutcome, GraphError> {
        let mut outcome = BuildOutcome::default();

        for (idx, phase) in self.phases.iter().enumerate() {
            info!(phase = idx, tasks = ?phase, "build phase");
            let run = self.scheduler.run(phase).await?;
            let failed = !run.is_success();
            outcome.phases.push(run);
            if failed {
                warn!(phase = idx, "build phase failed; later phases skipped");
                break;
            }
        }

        Ok(outcome)
    }

    /// Build, then publish the output root exactly once if the build succeeded.
    pub async fn deploy(&self) -> Result<BuildOutcome, DeployError> {
        let (publisher, target) = self.publisher.as_ref().ok_or(DeployError::NoPublishTarget)?;

        let outcome = self.build().await?;
        if let Some(failed) = outcome.failed_phase() {
            return Err(DeployError::Build(failed.clone()));
        }

        publisher.publish(&self.output_root, target).await?;
        info!(%target, "deployed");
        Ok(outcome)
    }

    pub async fn run_task(&self, name: &str) -> Result<RunOutcome, GraphError> {
        self.scheduler.run(&[name]).await
    }

    /// Watch controller over this façade's scheduler, filesystem and hash
    /// storage, not yet started.
    pub fn watch_controller(&self) -> WatchController {
        let store: Box<dyn HashStore> = match self.hash_storage_mode {
            HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
            HashStorageMode::File => Box::new(FileHashStore::new(&self.source_root, Arc::clone(&self.fs))),
        };
        WatchController::new(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.fs),
            self.source_root.clone(),
            self.debounce,
        )
        .with_hash_store(store)
    }

    /// Watch the source root until Ctrl-C.
    pub async fn watch(&self) -> Result<WatchSummary> {
        self.watch_until(ctrl_c()).await
    }

    pub async fn watch_until<F>(&self, shutdown: F) -> Result<WatchSummary>
    where
        F: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let _watcher = spawn_watcher(&self.source_root, tx)
            .with_context(|| format!("watching {}", self.source_root.display()))?;

        Ok(self
            .watch_controller()
            .start_until(self.subscriptions.clone(), rx, shutdown)
            .await)
    }

    /// Development mode: build once, then watch and serve until Ctrl-C.
    pub async fn develop(&self) -> Result<DevelopOutcome> {
        self.develop_until(ctrl_c()).await
    }

    /// A failed initial build is reported but does not stop watching.
    pub async fn develop_until<F>(&self, shutdown: F) -> Result<DevelopOutcome>
    where
        F: Future<Output = ()>,
    {
        let build = self.build().await?;
        if !build.is_success() {
            error!("initial build failed; watching anyway");
            for line in build.describe_failures().lines() {
                error!("{line}");
            }
        }

        let watch = self.watch_until(shutdown);
        let watch = match &self.server {
            None => watch.await?,
            Some((server, port)) => {
                let serve = server.serve(&self.output_root, *port);
                tokio::pin!(watch);
                tokio::pin!(serve);
                tokio::select! {
                    summary = &mut watch => summary?,
                    served = &mut serve => {
                        match served {
                            Ok(()) => warn!("static server exited; still watching"),
                            Err(err) => error!(error = %format!("{err:#}"), "static server failed; still watching"),
                        }
                        watch.await?
                    }
                }
            }
        };

        Ok(DevelopOutcome { build, watch })
    }

    /// Resolved plans a command would run, without running anything.
    pub fn plan(&self, command: &Command) -> Result<Vec<ExecutionPlan>, GraphError> {
        let graph = self.scheduler.graph();
        match command {
            Command::Build | Command::Deploy | Command::Default => {
                self.phases.iter().map(|p| graph.resolve_closure(p)).collect()
            }
            Command::Watch => Ok(Vec::new()),
            Command::Task(name) => Ok(vec![graph.resolve_closure(&[name])?]),
        }
    }

    /// Human-readable dry-run report for `command`.
    pub fn describe_plan(&self, command: &Command) -> Result<String, GraphError> {
        let plans = self.plan(command)?;
        let mut out = String::new();
        let _ = writeln!(out, "taskforge dry-run: {command}");

        for (idx, plan) in plans.iter().enumerate() {
            if plans.len() > 1 {
                let _ = writeln!(out, "phase {idx}:");
            }
            for (stage_idx, stage) in plan.stages().iter().enumerate() {
                let _ = writeln!(out, "  stage {stage_idx}: {}", stage.join(", "));
            }
        }

        if matches!(command, Command::Deploy) {
            match &self.publisher {
                Some((_, target)) => {
                    let _ = writeln!(out, "then publish {} to {target}", self.output_root.display());
                }
                None => {
                    let _ = writeln!(out, "no [publish] section; deploy would fail");
                }
            }
        }

        if matches!(command, Command::Watch | Command::Default) {
            let _ = writeln!(out, "watch subscriptions ({}):", self.subscriptions.len());
            for sub in &self.subscriptions {
                let _ = writeln!(
                    out,
                    "  {} -> {}{}",
                    sub.matcher().patterns().join(", "),
                    sub.tasks().join(", "),
                    if sub.use_hash() { " (use_hash)" } else { "" }
                );
            }
        }

        Ok(out)
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
