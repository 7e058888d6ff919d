#![allow(dead_code)]

//! Closure-backed task bodies for scheduler and controller tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskforge::dag::{task_fn, TaskBody, TaskReport};
use taskforge::engine::TaskFailure;

/// Shared, ordered record of task start/finish events.
///
/// Entries look like `"start:html"` and `"end:html"`.
#[derive(Debug, Clone, Default)]
pub struct TaskLog {
    events: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl TaskLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Names of tasks in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    pub fn count_started(&self, name: &str) -> usize {
        self.started().iter().filter(|n| *n == name).count()
    }

    /// Highest number of logged tasks that were running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn enter(&self, name: &str) {
        self.events.lock().unwrap().push(format!("start:{name}"));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self, name: &str) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("end:{name}"));
    }
}

/// Logs start and end, sleeps for `delay` in between, then succeeds.
pub fn logged_task(log: &TaskLog, name: &str, delay: Duration) -> Arc<dyn TaskBody> {
    let log = log.clone();
    let name = name.to_string();
    task_fn(move || {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.enter(&name);
            tokio::time::sleep(delay).await;
            log.exit(&name);
            Ok(TaskReport::default())
        }
    })
}

/// Like [`logged_task`] but fails with an I/O failure after logging.
pub fn failing_task(log: &TaskLog, name: &str, message: &str) -> Arc<dyn TaskBody> {
    let log = log.clone();
    let name = name.to_string();
    let message = message.to_string();
    task_fn(move || {
        let log = log.clone();
        let name = name.clone();
        let message = message.clone();
        async move {
            log.enter(&name);
            log.exit(&name);
            Err(TaskFailure::Io(message))
        }
    })
}

/// Succeeds immediately and reports `written` as its outputs.
pub fn writing_task(written: &[&str]) -> Arc<dyn TaskBody> {
    let written: Vec<PathBuf> = written.iter().map(PathBuf::from).collect();
    task_fn(move || {
        let written = written.clone();
        async move { Ok(TaskReport { written }) }
    })
}

pub fn noop_task() -> Arc<dyn TaskBody> {
    task_fn(|| async { Ok(TaskReport::default()) })
}
