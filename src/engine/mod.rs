// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the staged [`Scheduler`] that runs an execution plan
//! - the [`RunOutcome`] / [`TaskFailure`] types it reports
//! - the [`RunQueue`] used by the watch controller to hold re-triggers that
//!   overlap an in-flight run

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

pub mod outcome;
pub mod queue;
pub mod scheduler;

pub use outcome::{RunOutcome, RunStatus, TaskFailure};
pub use queue::{PendingBatch, RunQueue};
pub use scheduler::Scheduler;
