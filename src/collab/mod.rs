// src/collab/mod.rs

//! External collaborators: live-reload sink, static server and publisher.
//!
//! Each is a trait so the engine can be driven by recording fakes in tests.
//! Production implementations shell out through [`crate::exec`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use anyhow::Result;
use thiserror::Error;

pub mod notifier;
pub mod publisher;
pub mod server;

pub use notifier::{CommandNotifier, LogNotifier};
pub use publisher::CommandPublisher;
pub use server::CommandServer;

/// Boxed future returned by collaborator methods.
pub type CollabFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receives "task X finished, reload" notifications.
pub trait ReloadNotifier: Send + Sync {
    fn notify<'a>(&'a self, task: &'a str) -> CollabFuture<'a, Result<()>>;
}

/// Serves the output root over HTTP until it fails or is dropped.
pub trait StaticServer: Send + Sync {
    fn serve<'a>(&'a self, root: &'a Path, port: u16) -> CollabFuture<'a, Result<()>>;
}

/// Where a deployment goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub host: String,
    pub project: String,
}

impl std::fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.project)
    }
}

#[derive(Error, Debug)]
#[error("publishing to {target} failed: {source:#}")]
pub struct PublishError {
    pub target: PublishTarget,
    #[source]
    pub source: anyhow::Error,
}

/// Uploads a finished output tree to a remote target.
pub trait Publisher: Send + Sync {
    fn publish<'a>(
        &'a self,
        output: &'a Path,
        target: &'a PublishTarget,
    ) -> CollabFuture<'a, Result<(), PublishError>>;
}
