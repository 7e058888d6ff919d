// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::dag::{ExecutionPlan, Task, TaskBody};
use crate::engine::TaskName;
use crate::errors::GraphError;

/// Registration-ordered task graph.
///
/// Tasks are kept in the order they were registered; that order breaks ties
/// everywhere a deterministic order among unrelated tasks is needed. The
/// graph is built once at startup and then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<TaskName, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with its direct dependencies.
    ///
    /// Dependencies may name tasks registered later; they are checked by
    /// [`TaskGraph::validate`].
    pub fn register(
        &mut self,
        name: &str,
        deps: &[&str],
        body: Arc<dyn TaskBody>,
    ) -> Result<(), GraphError> {
        self.register_task(Task::new(name, deps, body))
    }

    /// Register a fully built [`Task`]. The graph is unchanged on error.
    pub fn register_task(&mut self, task: Task) -> Result<(), GraphError> {
        if self.index.contains_key(&task.name) {
            return Err(GraphError::DuplicateTask(task.name));
        }
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Check that every dependency resolves and that the graph is acyclic.
    pub fn validate(&self) -> Result<(), GraphError> {
        for task in &self.tasks {
            if let Some(dep) = task.deps.iter().find(|d| !self.index.contains_key(*d)) {
                return Err(GraphError::UnknownDependency {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        // Edge direction: dependency -> dependent.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for (idx, task) in self.tasks.iter().enumerate() {
            graph.add_node(idx);
            for dep in &task.deps {
                graph.add_edge(self.index[dep], idx, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let scc = tarjan_scc(&graph)
                    .into_iter()
                    .find(|component| component.contains(&cycle.node_id()))
                    .unwrap_or_else(|| vec![cycle.node_id()]);
                Err(GraphError::Cycle(self.cycle_within(&scc)))
            }
        }
    }

    /// Resolve the transitive dependency closure of `roots` into stages.
    ///
    /// Stage index is 0 for tasks without dependencies and otherwise one more
    /// than the highest stage among its dependencies.
    pub fn resolve_closure<S: AsRef<str>>(&self, roots: &[S]) -> Result<ExecutionPlan, GraphError> {
        let mut in_closure = vec![false; self.tasks.len()];
        let mut stack = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let idx = self
                .index_of(root)
                .ok_or_else(|| GraphError::UnknownTask(root.to_string()))?;
            stack.push(idx);
        }

        while let Some(idx) = stack.pop() {
            if in_closure[idx] {
                continue;
            }
            in_closure[idx] = true;
            for dep in &self.tasks[idx].deps {
                match self.index_of(dep) {
                    Some(d) => stack.push(d),
                    None => {
                        return Err(GraphError::UnknownDependency {
                            task: self.tasks[idx].name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
        }

        // Longest-path layering, relaxed in rounds over registration order.
        let members: Vec<usize> = (0..self.tasks.len()).filter(|i| in_closure[*i]).collect();
        let mut stage: Vec<Option<usize>> = vec![None; self.tasks.len()];
        let mut remaining = members.len();

        while remaining > 0 {
            let mut progressed = false;
            for &idx in &members {
                if stage[idx].is_some() {
                    continue;
                }
                let dep_stages: Option<Vec<usize>> = self.tasks[idx]
                    .deps
                    .iter()
                    .map(|d| stage[self.index[d]])
                    .collect();
                if let Some(dep_stages) = dep_stages {
                    stage[idx] = Some(dep_stages.iter().map(|s| s + 1).max().unwrap_or(0));
                    remaining -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                let stuck: Vec<usize> = members
                    .iter()
                    .copied()
                    .filter(|i| stage[*i].is_none())
                    .collect();
                return Err(GraphError::Cycle(self.cycle_within(&stuck)));
            }
        }

        let depth = members
            .iter()
            .filter_map(|i| stage[*i])
            .max()
            .map_or(0, |m| m + 1);
        let mut stages: Vec<Vec<TaskName>> = vec![Vec::new(); depth];
        for &idx in &members {
            if let Some(s) = stage[idx] {
                stages[s].push(self.tasks[idx].name.clone());
            }
        }

        Ok(ExecutionPlan::new(stages))
    }

    /// Names in the closure of `roots` (roots included).
    pub fn closure_names<S: AsRef<str>>(&self, roots: &[S]) -> Result<HashSet<TaskName>, GraphError> {
        let plan = self.resolve_closure(roots)?;
        Ok(plan.tasks().map(str::to_string).collect())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index_of(name).map(|i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a task in registration order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Task names in registration order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    /// Immediate dependencies of a task, as declared.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.get(name).map(|t| t.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task, in registration order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.deps.iter().any(|d| d == name))
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Walk dependency edges inside `component` starting from its earliest
    /// registered task until a task repeats; the repeated segment is a cycle
    /// where each task depends on the next.
    fn cycle_within(&self, component: &[usize]) -> Vec<TaskName> {
        let members: HashSet<usize> = component.iter().copied().collect();
        let Some(&start) = component.iter().min() else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut position: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        loop {
            let current = path[path.len() - 1];
            let next = self.tasks[current]
                .deps
                .iter()
                .filter_map(|d| self.index_of(d))
                .find(|d| members.contains(d));
            let Some(next) = next else {
                // Not reachable for a strongly connected component.
                break;
            };
            if let Some(&at) = position.get(&next) {
                path.drain(..at);
                break;
            }
            position.insert(next, path.len());
            path.push(next);
        }

        path.into_iter()
            .map(|i| self.tasks[i].name.clone())
            .collect()
    }
}
