// src/engine/queue.rs

use std::collections::HashSet;

use tracing::debug;

use crate::engine::TaskName;

/// A queued re-trigger: the triggered tasks and their dependency closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBatch {
    pub tasks: Vec<TaskName>,
    pub closure: HashSet<TaskName>,
}

impl PendingBatch {
    pub fn new(tasks: Vec<TaskName>, closure: HashSet<TaskName>) -> Self {
        Self { tasks, closure }
    }

    fn absorb(&mut self, other: PendingBatch) {
        for task in other.tasks {
            if !self.tasks.contains(&task) {
                self.tasks.push(task);
            }
        }
        self.closure.extend(other.closure);
    }
}

/// Re-triggers waiting for an overlapping in-flight run to finish.
///
/// Semantics:
/// - Pending batches are kept in groups with pairwise disjoint closures.
/// - A recorded batch is merged with every group its closure touches, so
///   any number of overlapping re-triggers produce a single future run.
/// - A batch touching no group forms its own group and never waits behind
///   unrelated work.
/// - Order of first appearance is preserved; duplicates are dropped.
#[derive(Debug, Default)]
pub struct RunQueue {
    groups: Vec<PendingBatch>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of independent pending groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn record(&mut self, batch: PendingBatch) {
        let first = self
            .groups
            .iter()
            .position(|g| !g.closure.is_disjoint(&batch.closure));

        let Some(first) = first else {
            debug!(tasks = ?batch.tasks, "queued re-trigger");
            self.groups.push(batch);
            return;
        };

        let mut merged = PendingBatch::default();
        let mut kept = Vec::with_capacity(self.groups.len());
        for (idx, group) in std::mem::take(&mut self.groups).into_iter().enumerate() {
            if idx == first || !group.closure.is_disjoint(&batch.closure) {
                merged.absorb(group);
            } else {
                kept.push(group);
            }
        }
        merged.absorb(batch);
        debug!(tasks = ?merged.tasks, "re-trigger merged into pending group");

        let at = kept.len().min(first);
        kept.insert(at, merged);
        self.groups = kept;
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingBatch> {
        self.groups.iter()
    }

    /// Remove and return every group for which `blocked` is false, in queue
    /// order.
    pub fn take_ready(&mut self, blocked: impl Fn(&HashSet<TaskName>) -> bool) -> Vec<PendingBatch> {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.groups)
            .into_iter()
            .partition(|g| !blocked(&g.closure));
        self.groups = waiting;
        ready
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
