// src/tasks/mod.rs

//! Production task bodies and their registration from configuration.
//!
//! - [`PipelineTask`] runs a file pipeline.
//! - [`CleanTask`] deletes output files.
//! - [`CommandTask`] runs a shell command.
//! - [`registry`] turns a [`crate::config::ConfigFile`] into a validated
//!   [`crate::dag::TaskGraph`].
//! - [`outputs`] checks that concurrently running tasks declare disjoint outputs.

pub mod clean;
pub mod command;
pub mod outputs;
pub mod pipeline;
pub mod registry;

pub use clean::CleanTask;
pub use command::CommandTask;
pub use pipeline::PipelineTask;
pub use registry::{build_graph, BuildEnv};
