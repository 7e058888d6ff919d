// src/engine/scheduler.rs

//! Staged task scheduler.
//!
//! A run resolves the closure of its roots into stages, spawns every task of
//! a stage concurrently, waits for all of them, and only then decides whether
//! to continue. There is no mid-stage cancellation.

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};

use crate::collab::{LogNotifier, ReloadNotifier};
use crate::dag::{RunLedger, TaskGraph, TaskReport};
use crate::engine::{RunOutcome, TaskFailure, TaskName};
use crate::errors::GraphError;

type TaskResult = Result<TaskReport, TaskFailure>;

/// Upper bound on a single reload notification.
pub const DEFAULT_RELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs task closures from a shared, validated [`TaskGraph`].
///
/// A scheduler may be shared between concurrent runs (the watch controller
/// does this); every run gets its own ledger and run id.
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    notifier: Arc<dyn ReloadNotifier>,
    reload_timeout: Duration,
    next_run_id: AtomicU64,
}

impl Scheduler {
    pub fn new(graph: Arc<TaskGraph>, notifier: Arc<dyn ReloadNotifier>) -> Self {
        Self {
            graph,
            notifier,
            reload_timeout: DEFAULT_RELOAD_TIMEOUT,
            next_run_id: AtomicU64::new(1),
        }
    }

    pub fn with_reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = timeout;
        self
    }

    /// Scheduler that only logs reload notifications.
    pub fn with_log_notifier(graph: Arc<TaskGraph>) -> Self {
        Self::new(graph, Arc::new(LogNotifier))
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    /// Run `roots` and everything they depend on.
    ///
    /// Graph errors (unknown roots) are returned before any task starts.
    /// Task failures are reported through the returned [`RunOutcome`].
    pub async fn run<S: AsRef<str>>(&self, roots: &[S]) -> Result<RunOutcome, GraphError> {
        let plan = self.graph.resolve_closure(roots)?;
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let root_names: Vec<&str> = roots.iter().map(AsRef::as_ref).collect();

        info!(run_id, roots = ?root_names, stages = plan.len(), "starting run");

        let mut ledger = RunLedger::new(run_id, &plan);
        let mut failures: Vec<(TaskName, TaskFailure)> = Vec::new();
        let mut written: Vec<PathBuf> = Vec::new();

        for (stage_idx, stage) in plan.stages().iter().enumerate() {
            debug!(run_id, stage = stage_idx, tasks = ?stage, "starting stage");

            let mut results = self.run_stage(run_id, stage, &mut ledger).await;
            detect_output_conflicts(stage, &mut results);

            let mut stage_failed = false;
            for name in stage {
                let result = results
                    .remove(name)
                    .unwrap_or_else(|| Err(TaskFailure::Panicked("task result was lost".into())));

                match result {
                    Ok(report) => {
                        ledger.finish(name, true);
                        info!(run_id, task = %name, files = report.written.len(), "task succeeded");
                        written.extend(report.written);
                        self.notify_reload(run_id, name).await;
                    }
                    Err(failure) => {
                        ledger.finish(name, false);
                        error!(run_id, task = %name, error = %failure, "task failed");
                        failures.push((name.clone(), failure));
                        stage_failed = true;
                    }
                }
            }

            if stage_failed {
                warn!(run_id, stage = stage_idx, "stage failed; later stages will not start");
                break;
            }
        }

        let skipped = ledger.pending();
        if !skipped.is_empty() {
            info!(run_id, skipped = ?skipped, "tasks skipped");
        }

        written.sort();
        let outcome = RunOutcome {
            run_id,
            stages: plan.into_stages(),
            states: ledger.into_states(),
            failures,
            skipped,
            written,
        };
        info!(run_id, status = ?outcome.status(), "run finished");
        Ok(outcome)
    }

    /// Spawn every task of a stage and wait for all of them.
    async fn run_stage(
        &self,
        run_id: u64,
        stage: &[TaskName],
        ledger: &mut RunLedger,
    ) -> HashMap<TaskName, TaskResult> {
        let mut set: JoinSet<TaskResult> = JoinSet::new();
        let mut names: HashMap<Id, TaskName> = HashMap::new();

        for name in stage {
            let Some(task) = self.graph.get(name) else {
                // resolve_closure only yields registered names.
                continue;
            };
            ledger.start(name);
            debug!(run_id, task = %name, "spawning task");

            let body = Arc::clone(&task.body);
            let handle = set.spawn(async move { body.run().await });
            names.insert(handle.id(), name.clone());
        }

        let mut results = HashMap::new();
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(name) = names.remove(&id) {
                        results.insert(name, result);
                    }
                }
                Err(err) => {
                    if let Some(name) = names.remove(&err.id()) {
                        let message = if err.is_panic() {
                            panic_message(err.into_panic())
                        } else {
                            err.to_string()
                        };
                        results.insert(name, Err(TaskFailure::Panicked(message)));
                    }
                }
            }
        }
        results
    }

    async fn notify_reload(&self, run_id: u64, task: &str) {
        let wants_reload = self.graph.get(task).is_some_and(|t| t.reload);
        if !wants_reload {
            return;
        }
        match tokio::time::timeout(self.reload_timeout, self.notifier.notify(task)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(run_id, task, error = %err, "reload notification failed"),
            Err(_) => warn!(
                run_id,
                task,
                timeout_ms = self.reload_timeout.as_millis() as u64,
                "reload notification timed out"
            ),
        }
    }
}

/// Fail every task in `stage` that wrote a path an earlier task of the same
/// stage (in stage order) also wrote.
fn detect_output_conflicts(stage: &[TaskName], results: &mut HashMap<TaskName, TaskResult>) {
    let mut owners: HashMap<PathBuf, TaskName> = HashMap::new();

    for name in stage {
        let Some(Ok(report)) = results.get(name) else {
            continue;
        };

        let conflict = report
            .written
            .iter()
            .find_map(|path| owners.get(path).map(|other| (path.clone(), other.clone())));

        for path in &report.written {
            owners.entry(path.clone()).or_insert_with(|| name.clone());
        }

        if let Some((path, other)) = conflict {
            warn!(task = %name, other = %other, path = %path.display(), "output conflict");
            results.insert(name.clone(), Err(TaskFailure::OutputConflict { path, other }));
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
