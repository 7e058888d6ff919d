#![allow(dead_code)]

//! Recording fakes for the reload, publish and serve collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use taskforge::collab::{
    CollabFuture, PublishError, PublishTarget, Publisher, ReloadNotifier, StaticServer,
};

/// Remembers every task it was notified about, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notified: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

impl ReloadNotifier for RecordingNotifier {
    fn notify<'a>(&'a self, task: &'a str) -> CollabFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.notified.lock().unwrap().push(task.to_string());
            Ok(())
        })
    }
}

/// Records publish calls; optionally fails every one of them.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    calls: Arc<Mutex<Vec<(PathBuf, PublishTarget)>>>,
    fail_with: Option<String>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            calls: Arc::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PublishTarget)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Publisher for RecordingPublisher {
    fn publish<'a>(
        &'a self,
        output: &'a Path,
        target: &'a PublishTarget,
    ) -> CollabFuture<'a, Result<(), PublishError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((output.to_path_buf(), target.clone()));
            match &self.fail_with {
                Some(message) => Err(PublishError {
                    target: target.clone(),
                    source: anyhow!("{message}"),
                }),
                None => Ok(()),
            }
        })
    }
}

/// Server that records its start and then idles until dropped.
#[derive(Debug, Clone, Default)]
pub struct IdleServer {
    started: Arc<Mutex<Vec<(PathBuf, u16)>>>,
}

impl IdleServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<(PathBuf, u16)> {
        self.started.lock().unwrap().clone()
    }
}

impl StaticServer for IdleServer {
    fn serve<'a>(&'a self, root: &'a Path, port: u16) -> CollabFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.started.lock().unwrap().push((root.to_path_buf(), port));
            std::future::pending::<()>().await;
            Ok(())
        })
    }
}
