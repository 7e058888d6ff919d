// src/dag/plan.rs

use crate::engine::TaskName;

/// Staged execution order for a run.
///
/// Tasks in stage `n` depend only on tasks in earlier stages; within a stage
/// tasks are listed in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    stages: Vec<Vec<TaskName>>,
}

impl ExecutionPlan {
    pub fn new(stages: Vec<Vec<TaskName>>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Vec<TaskName>] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<Vec<TaskName>> {
        self.stages
    }

    /// All tasks in plan order (stage by stage).
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().flatten().map(String::as_str)
    }

    pub fn stage_of(&self, task: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|stage| stage.iter().any(|t| t == task))
    }

    pub fn contains(&self, task: &str) -> bool {
        self.stage_of(task).is_some()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
