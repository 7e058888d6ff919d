// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that shells out goes through here: command tasks, stdin/stdout
//! transforms, and the command-backed collaborators (reload, serve, publish).
//!
//! - [`process`] runs a shell command with `tokio::process::Command`,
//!   optionally feeding it stdin, and captures its output.
//! - [`template`] expands `{placeholder}` variables in configured commands.

pub mod process;
pub mod template;

pub use process::{run_shell, CommandOutput};
pub use template::{expand, placeholders};
