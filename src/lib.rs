// src/lib.rs

pub mod cli;
pub mod collab;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod facade;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::{config_root_dir, load_and_validate};
use crate::errors::DeployError;
use crate::facade::{BuildFacade, Command};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - task graph construction (through [`BuildFacade::from_config`])
/// - dispatch of the requested command
///
/// Returns `Ok(false)` when the command ran but failed; every failed task
/// and its causes have been printed to stderr by then.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let config_dir = config_root_dir(&config_path);

    let facade = BuildFacade::from_config(&cfg, &config_dir)?;
    let command = Command::from(args.command.as_str());

    if args.dry_run {
        print!("{}", facade.describe_plan(&command)?);
        return Ok(true);
    }

    info!(%command, config = %config_path.display(), "running");

    match command {
        Command::Build => {
            let outcome = facade.build().await?;
            if !outcome.is_success() {
                eprint!("{}", outcome.describe_failures());
            }
            Ok(outcome.is_success())
        }
        Command::Deploy => match facade.deploy().await {
            Ok(_) => Ok(true),
            Err(DeployError::Build(outcome)) => {
                eprintln!("build failed; nothing was published");
                eprint!("{}", outcome.describe_failures());
                Ok(false)
            }
            Err(DeployError::Publish(err)) => {
                eprintln!("{err}");
                Ok(false)
            }
            Err(other) => Err(other.into()),
        },
        Command::Default => {
            let done = facade.develop().await?;
            info!(runs = done.watch.runs, failed = done.watch.failed_runs, "development mode stopped");
            Ok(true)
        }
        Command::Watch => {
            facade.watch().await?;
            Ok(true)
        }
        Command::Task(name) => {
            let outcome = facade.run_task(&name).await?;
            if !outcome.is_success() {
                eprint!("{}", outcome.describe_failures());
            }
            Ok(outcome.is_success())
        }
    }
}
