// src/dag/state.rs

//! Per-run state transitions for the tasks of one scheduler invocation.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::dag::ExecutionPlan;
use crate::engine::TaskName;

/// Lifecycle of a task within a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// Run-local ledger of task states, in plan order.
///
/// Every task of the plan starts `Pending`. A task moves
/// `Pending -> Running -> {Succeeded, Failed}` at most once; any other
/// transition is refused and logged.
#[derive(Debug, Clone)]
pub struct RunLedger {
    run_id: u64,
    states: IndexMap<TaskName, TaskState>,
}

impl RunLedger {
    pub fn new(run_id: u64, plan: &ExecutionPlan) -> Self {
        let states = plan
            .tasks()
            .map(|name| (name.to_string(), TaskState::Pending))
            .collect();
        Self { run_id, states }
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states.get(task).copied()
    }

    /// Mark a pending task as running. Returns false if the transition was refused.
    pub fn start(&mut self, task: &str) -> bool {
        self.transition(task, TaskState::Pending, TaskState::Running)
    }

    /// Record the final state of a running task.
    pub fn finish(&mut self, task: &str, succeeded: bool) -> bool {
        let to = if succeeded {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        };
        self.transition(task, TaskState::Running, to)
    }

    /// Tasks that never started in this run.
    pub fn pending(&self) -> Vec<TaskName> {
        self.states
            .iter()
            .filter(|(_, s)| **s == TaskState::Pending)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn into_states(self) -> Vec<(TaskName, TaskState)> {
        self.states.into_iter().collect()
    }

    fn transition(&mut self, task: &str, from: TaskState, to: TaskState) -> bool {
        match self.states.get_mut(task) {
            Some(state) if *state == from => {
                debug!(run_id = self.run_id, task, ?from, ?to, "task state change");
                *state = to;
                true
            }
            Some(state) => {
                warn!(
                    run_id = self.run_id,
                    task,
                    current = ?*state,
                    requested = ?to,
                    "refusing invalid task state transition"
                );
                false
            }
            None => {
                warn!(run_id = self.run_id, task, "task is not part of this run");
                false
            }
        }
    }
}
