#![allow(dead_code)]

pub use taskforge_test_utils::init_tracing;

use std::path::Path;
use std::sync::Arc;

use taskforge::collab::{PublishTarget, ReloadNotifier};
use taskforge::config::ConfigFile;
use taskforge::dag::{TaskBody, TaskGraph};
use taskforge::engine::Scheduler;
use taskforge::facade::BuildFacade;
use taskforge::fs::mock::MockFileSystem;

/// Registers tasks in call order; `build` validates the graph.
#[derive(Default)]
pub struct GraphBuilder {
    graph: TaskGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, name: &str, deps: &[&str], body: Arc<dyn TaskBody>) -> Self {
        self.graph.register(name, deps, body).expect("register task");
        self
    }

    pub fn build(self) -> TaskGraph {
        self.graph.validate().expect("valid graph");
        self.graph
    }
}

pub fn scheduler_with(graph: TaskGraph, notifier: Arc<dyn ReloadNotifier>) -> Arc<Scheduler> {
    Arc::new(Scheduler::new(Arc::new(graph), notifier))
}

/// Façade over an in-memory filesystem rooted at `/site`.
///
/// Commands still run on the real disk, in `config_dir`.
pub fn mock_facade(
    cfg: &ConfigFile,
    config_dir: &Path,
    fs: &MockFileSystem,
    notifier: Arc<dyn ReloadNotifier>,
) -> BuildFacade {
    BuildFacade::from_config_with(cfg, config_dir, Arc::new(fs.clone()), notifier)
        .expect("facade from config")
}

pub fn target() -> PublishTarget {
    PublishTarget {
        host: "deploy.example.org".into(),
        project: "site".into(),
    }
}
