// src/dag/task.rs

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::{TaskFailure, TaskName};

/// Future returned by a task body.
pub type TaskFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TaskReport, TaskFailure>> + Send + 'a>>;

/// What a successfully completed task did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Output files written by this task, absolute or output-rooted.
    pub written: Vec<PathBuf>,
}

/// The work a task performs when the scheduler runs it.
///
/// Production bodies live in [`crate::tasks`]; tests usually build bodies
/// from closures with [`task_fn`].
pub trait TaskBody: Send + Sync {
    fn run(&self) -> TaskFuture<'_>;
}

struct FnTask<F>(F);

impl<F, Fut> TaskBody for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskReport, TaskFailure>> + Send + 'static,
{
    fn run(&self) -> TaskFuture<'_> {
        Box::pin((self.0)())
    }
}

/// Wrap an async closure as a task body.
pub fn task_fn<F, Fut>(f: F) -> Arc<dyn TaskBody>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskReport, TaskFailure>> + Send + 'static,
{
    Arc::new(FnTask(f))
}

/// A registered task: name, declared dependencies and body.
#[derive(Clone)]
pub struct Task {
    pub name: TaskName,
    /// Direct dependencies, in declaration order.
    pub deps: Vec<TaskName>,
    pub body: Arc<dyn TaskBody>,
    /// Notify the reload sink after this task succeeds.
    pub reload: bool,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, deps: &[&str], body: Arc<dyn TaskBody>) -> Self {
        Self {
            name: name.into(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            body,
            reload: false,
        }
    }

    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}
