// src/dag/mod.rs

//! Task graph representation and per-run task state.
//!
//! - [`task`] defines a registered task and the [`TaskBody`] it runs.
//! - [`graph`] holds the registration-ordered task graph and validates it.
//! - [`plan`] is the staged execution plan resolved for a set of roots.
//! - [`state`] tracks per-run state transitions for the scheduler.

pub mod graph;
pub mod plan;
pub mod state;
pub mod task;

pub use graph::TaskGraph;
pub use plan::ExecutionPlan;
pub use state::{RunLedger, TaskState};
pub use task::{task_fn, Task, TaskBody, TaskFuture, TaskReport};
