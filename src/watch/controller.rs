// src/watch/controller.rs

//! Turns filesystem change events into debounced, coalesced re-runs.
//!
//! The controller loop multiplexes three sources with `tokio::select!`:
//! - incoming [`WatchEvent`]s, which extend the current burst
//! - the debounce deadline, which flushes the burst into a batch of tasks
//! - completion of in-flight runs, which may release queued batches
//!
//! A batch whose dependency closure overlaps a run still in flight waits in
//! the [`RunQueue`]; disjoint batches start immediately, even while others
//! are queued.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{Id, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::engine::{PendingBatch, RunOutcome, RunQueue, Scheduler, TaskName};
use crate::errors::GraphError;
use crate::fs::FileSystem;
use crate::pipeline::collect_matching_files;
use crate::watch::hash::{compute_aggregate_hash, HashStore, MemoryHashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::{WatchEvent, WatchSubscription};

/// Counts reported when the controller stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub runs: usize,
    pub failed_runs: usize,
}

struct InFlight {
    batch: Vec<TaskName>,
    closure: HashSet<TaskName>,
}

pub struct WatchController {
    scheduler: Arc<Scheduler>,
    fs: Arc<dyn FileSystem>,
    source_root: PathBuf,
    debounce: Duration,
    hash_store: Box<dyn HashStore>,
}

impl WatchController {
    pub fn new(
        scheduler: Arc<Scheduler>,
        fs: Arc<dyn FileSystem>,
        source_root: impl Into<PathBuf>,
        debounce: Duration,
    ) -> Self {
        Self {
            scheduler,
            fs,
            source_root: source_root.into(),
            debounce,
            hash_store: Box::new(MemoryHashStore::new()),
        }
    }

    pub fn with_hash_store(mut self, store: Box<dyn HashStore>) -> Self {
        self.hash_store = store;
        self
    }

    /// Process events until the channel closes, then wait for in-flight runs.
    ///
    /// A burst still pending when the channel closes is flushed and run.
    pub async fn start(
        self,
        subscriptions: Vec<WatchSubscription>,
        events: mpsc::UnboundedReceiver<WatchEvent>,
    ) -> WatchSummary {
        self.start_until(subscriptions, events, std::future::pending())
            .await
    }

    /// Like [`WatchController::start`], but also stops taking events once
    /// `shutdown` resolves. Pending bursts and queued batches are dropped on
    /// shutdown; runs already in flight are awaited.
    pub async fn start_until<F>(
        mut self,
        subscriptions: Vec<WatchSubscription>,
        mut events: mpsc::UnboundedReceiver<WatchEvent>,
        shutdown: F,
    ) -> WatchSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.prime_hashes(&subscriptions).await;
        info!(
            subscriptions = subscriptions.len(),
            debounce_ms = self.debounce.as_millis() as u64,
            "watch controller started"
        );

        let mut summary = WatchSummary::default();
        let mut touched: BTreeSet<usize> = BTreeSet::new();
        let mut deadline: Option<Instant> = None;
        let mut queue = RunQueue::new();
        let mut running: JoinSet<Result<RunOutcome, GraphError>> = JoinSet::new();
        let mut in_flight: HashMap<Id, InFlight> = HashMap::new();
        let mut accepting = true;

        loop {
            if !accepting && deadline.is_none() && running.is_empty() {
                break;
            }

            tokio::select! {
                maybe_event = events.recv(), if accepting => match maybe_event {
                    Some(event) => {
                        if self.collect(&event, &subscriptions, &mut touched) {
                            deadline = Some(Instant::now() + self.debounce);
                        }
                    }
                    None => {
                        debug!("watch event channel closed");
                        accepting = false;
                    }
                },

                _ = &mut shutdown, if accepting => {
                    info!("shutdown requested; waiting for in-flight runs");
                    accepting = false;
                    deadline = None;
                    touched.clear();
                    queue.clear();
                    events.close();
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let batch = self.flush(&subscriptions, std::mem::take(&mut touched)).await;
                    if batch.is_empty() {
                        debug!("burst produced no tasks to run");
                    } else {
                        match self.scheduler.graph().closure_names(batch.as_slice()) {
                            Ok(closure) => {
                                queue.record(PendingBatch::new(batch, closure));
                                self.start_ready(&mut queue, &mut running, &mut in_flight);
                            }
                            Err(err) => {
                                error!(error = %err, tasks = ?batch, "cannot resolve watch batch; dropping it");
                            }
                        }
                    }
                },

                Some(joined) = running.join_next_with_id(), if !running.is_empty() => {
                    summary.runs += 1;
                    let finished = match joined {
                        Ok((id, result)) => {
                            let batch = in_flight.remove(&id).map(|f| f.batch).unwrap_or_default();
                            report(&batch, result)
                        }
                        Err(err) => {
                            in_flight.remove(&err.id());
                            error!(error = %err, "re-run task aborted");
                            false
                        }
                    };
                    if !finished {
                        summary.failed_runs += 1;
                    }
                    self.start_ready(&mut queue, &mut running, &mut in_flight);
                },

                else => break,
            }
        }

        info!(runs = summary.runs, failed = summary.failed_runs, "watch controller stopped");
        summary
    }

    /// Add the subscriptions matching `event` to the burst.
    fn collect(&self, event: &WatchEvent, subs: &[WatchSubscription], touched: &mut BTreeSet<usize>) -> bool {
        let Some(rel) = relative_str(&self.source_root, &event.path) else {
            debug!(path = %event.path.display(), "event outside source root");
            return false;
        };

        let mut hit = false;
        for (idx, sub) in subs.iter().enumerate() {
            if sub.matches(&rel) {
                touched.insert(idx);
                hit = true;
            }
        }
        debug!(path = %rel, kind = ?event.kind, hit, "watch event");
        hit
    }

    /// Union of tasks bound to the touched subscriptions, in registration order.
    async fn flush(&mut self, subs: &[WatchSubscription], touched: BTreeSet<usize>) -> Vec<TaskName> {
        let mut tasks: BTreeSet<(usize, TaskName)> = BTreeSet::new();

        for idx in touched {
            let sub = &subs[idx];
            if sub.use_hash() && !self.contents_changed(sub).await {
                debug!(tasks = ?sub.tasks(), "content hash unchanged; skipping");
                continue;
            }
            for task in sub.tasks() {
                let order = self.scheduler.graph().index_of(task).unwrap_or(usize::MAX);
                tasks.insert((order, task.clone()));
            }
        }

        tasks.into_iter().map(|(_, name)| name).collect()
    }

    fn start_ready(
        &self,
        queue: &mut RunQueue,
        running: &mut JoinSet<Result<RunOutcome, GraphError>>,
        in_flight: &mut HashMap<Id, InFlight>,
    ) {
        let ready = queue.take_ready(|closure| in_flight.values().any(|f| !f.closure.is_disjoint(closure)));

        for PendingBatch { tasks: batch, closure } in ready {
            info!(tasks = ?batch, "starting re-run");
            let scheduler = Arc::clone(&self.scheduler);
            let roots = batch.clone();
            let handle = running.spawn(async move { scheduler.run(&roots).await });
            in_flight.insert(handle.id(), InFlight { batch, closure });
        }

        for pending in queue.pending() {
            info!(pending = ?pending.tasks, "overlapping run in flight; re-trigger queued");
        }
    }

    /// Record the current aggregate hash of every `use_hash` subscription
    /// that has none stored yet.
    async fn prime_hashes(&mut self, subs: &[WatchSubscription]) {
        let keys: Vec<String> = subs.iter().map(WatchSubscription::key).collect();
        let active: Vec<&str> = keys.iter().map(String::as_str).collect();
        if let Err(err) = self.hash_store.prune(&active) {
            warn!(error = %err, "failed to prune stale hashes");
        }

        for sub in subs.iter().filter(|s| s.use_hash()) {
            if matches!(self.hash_store.load(&sub.key()), Ok(Some(_))) {
                continue;
            }
            self.contents_changed(sub).await;
        }
    }

    /// Compare the subscription's current aggregate hash with the stored one,
    /// storing the new value. Errors count as "changed".
    async fn contents_changed(&mut self, sub: &WatchSubscription) -> bool {
        let fs = Arc::clone(&self.fs);
        let root = self.source_root.clone();
        let matcher = sub.matcher().clone();

        let joined = tokio::task::spawn_blocking(move || {
            let files = collect_matching_files(fs.as_ref(), &root, &matcher)?;
            compute_aggregate_hash(fs.as_ref(), &root, &files)
        })
        .await;

        let hash = match joined {
            Ok(Ok(hash)) => hash,
            Ok(Err(err)) => {
                warn!(error = %err, "hashing watched files failed");
                return true;
            }
            Err(err) => {
                warn!(error = %err, "hashing task failed");
                return true;
            }
        };

        let key = sub.key();
        let previous = self.hash_store.load(&key).unwrap_or_else(|err| {
            warn!(error = %err, "loading stored hash failed");
            None
        });
        if previous.as_deref() == Some(hash.as_str()) {
            return false;
        }
        if let Err(err) = self.hash_store.save(&key, &hash) {
            warn!(error = %err, "storing hash failed");
        }
        true
    }
}

/// Log a finished run. Returns true if it succeeded.
fn report(batch: &[TaskName], result: Result<RunOutcome, GraphError>) -> bool {
    match result {
        Ok(outcome) if outcome.is_success() => {
            info!(run_id = outcome.run_id, tasks = ?batch, "re-run succeeded");
            true
        }
        Ok(outcome) => {
            error!(
                run_id = outcome.run_id,
                failed = ?outcome.failed_tasks(),
                "re-run failed; still watching"
            );
            for line in outcome.describe_failures().lines() {
                error!(run_id = outcome.run_id, "{line}");
            }
            false
        }
        Err(err) => {
            error!(tasks = ?batch, error = %err, "re-run could not start");
            false
        }
    }
}
