// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskforge",
    version,
    about = "Build a static site through a graph of dependent tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskforge.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskforge.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKFORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the stages the command would run, without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// `build`, `deploy`, `default`, `watch`, or the name of any task.
    #[arg(value_name = "COMMAND", default_value = "default")]
    pub command: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
