//! Shared helpers for taskforge's integration tests.

pub mod builders;
pub mod collaborators;
pub mod tasks;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for any single async test body.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured per test and only shown for failures (or with
/// `--nocapture`). The filter comes from `TASKFORGE_LOG`, e.g.
/// `TASKFORGE_LOG=taskforge::watch=debug cargo test`, and defaults to
/// `info` for the crate.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("TASKFORGE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn,taskforge=info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    with_timeout_of(TEST_TIMEOUT, f).await
}

pub async fn with_timeout_of<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {limit:?}"),
    }
}

/// Poll `condition` every 50ms until it holds or `limit` passes.
///
/// Returns whether the condition was observed. For effects of real
/// filesystem watchers, whose latency varies by platform.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(50)).await;
    }
}
