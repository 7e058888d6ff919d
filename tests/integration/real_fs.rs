#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;

use taskforge::cli::CliArgs;
use taskforge::config::load_and_validate;
use taskforge::facade::BuildFacade;
use taskforge::watch::HASH_FILE_PATH;
use taskforge_test_utils::collaborators::IdleServer;
use taskforge_test_utils::{eventually, TEST_TIMEOUT};

use crate::common::init_tracing;

const CONFIG: &str = r#"
[config]
source = "app"
output = "build"
debounce_ms = 50
hash_storage_mode = "file"

[build]
phases = [["clean"], ["html", "scripts", "styles"]]

[task.clean]
clean = []

[task.html]
src = ["**/*.html"]
dest = ""

[task.scripts]
src = ["scripts/**/*.js"]
steps = [{ kind = "concat", output = "app.js", separator = ";\n" }]
dest = "scripts"

[task.styles]
src = ["styles/*.less"]
steps = [{ kind = "command", cmd = "tr a-z A-Z" }, { kind = "rename", extension = "css" }]
dest = "styles"

[task.lint]
src = ["**/*.js"]
steps = [{ kind = "check", cmd = "! grep -q debugger" }]

[[watch]]
pattern = ["**/*.html"]
tasks = ["html"]
use_hash = true
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "Taskforge.toml", CONFIG);
    write(root, "app/index.html", "<h1>v1</h1>");
    write(root, "app/blog/post.html", "<p>post</p>");
    write(root, "app/scripts/main.js", "main()");
    write(root, "app/scripts/lib/util.js", "util()");
    write(root, "app/styles/site.less", "body { color: red; }");
    write(root, "build/obsolete.html", "old");
    dir
}

fn args(root: &Path, command: &str) -> CliArgs {
    CliArgs {
        config: root.join("Taskforge.toml").to_string_lossy().into_owned(),
        log_level: None,
        dry_run: false,
        command: command.to_string(),
    }
}

#[tokio::test]
async fn build_produces_the_output_tree() {
    init_tracing();
    let dir = project();
    let root = dir.path();

    assert!(taskforge::run(args(root, "build")).await.unwrap());

    let build = root.join("build");
    assert!(!build.join("obsolete.html").exists());
    assert_eq!(fs::read_to_string(build.join("index.html")).unwrap(), "<h1>v1</h1>");
    assert_eq!(fs::read_to_string(build.join("blog/post.html")).unwrap(), "<p>post</p>");
    assert_eq!(
        fs::read_to_string(build.join("scripts/app.js")).unwrap(),
        "util();\nmain()"
    );
    assert_eq!(
        fs::read_to_string(build.join("styles/site.css")).unwrap(),
        "BODY { COLOR: RED; }"
    );
}

#[tokio::test]
async fn failing_task_makes_the_command_fail() {
    init_tracing();
    let dir = project();
    let root = dir.path();
    write(root, "app/scripts/debug.js", "debugger;");

    assert!(!taskforge::run(args(root, "lint")).await.unwrap());
    assert!(!root.join("build/scripts").exists());
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let dir = project();
    let root = dir.path();
    let mut dry = args(root, "build");
    dry.dry_run = true;

    assert!(taskforge::run(dry).await.unwrap());
    assert!(root.join("build/obsolete.html").exists());
    assert!(!root.join("build/index.html").exists());
}

#[tokio::test]
async fn unknown_command_is_an_error() {
    let dir = project();
    assert!(taskforge::run(args(dir.path(), "sprites")).await.is_err());
}

#[tokio::test]
async fn watch_rebuilds_changed_markup() {
    init_tracing();
    let dir = project();
    let root = dir.path();
    let cfg = load_and_validate(root.join("Taskforge.toml")).unwrap();
    let facade = BuildFacade::from_config(&cfg, root).unwrap_or_else(|e| panic!("{e}"));
    assert!(facade.build().await.unwrap().is_success());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let index = root.join("build/index.html");

    let (summary, rebuilt) = tokio::join!(
        facade.watch_until(async {
            let _ = stop_rx.await;
        }),
        async {
            // Give the watcher time to register.
            sleep(Duration::from_millis(300)).await;
            write(root, "app/index.html", "<h1>v2</h1>");

            let rebuilt = eventually(TEST_TIMEOUT, || {
                fs::read_to_string(&index).is_ok_and(|s| s == "<h1>v2</h1>")
            })
            .await;
            let _ = stop_tx.send(());
            rebuilt
        }
    );

    let summary = summary.unwrap();
    assert!(rebuilt, "build/index.html was not regenerated");
    assert!(summary.runs >= 1);
    assert_eq!(summary.failed_runs, 0);
    assert!(root.join("app").join(HASH_FILE_PATH).exists());
}

#[tokio::test]
async fn develop_builds_then_serves_until_stopped() {
    init_tracing();
    let dir = project();
    let root = dir.path();
    let cfg = load_and_validate(root.join("Taskforge.toml")).unwrap();
    let server = IdleServer::new();
    let facade = BuildFacade::from_config(&cfg, root)
        .unwrap_or_else(|e| panic!("{e}"))
        .with_server(Arc::new(server.clone()), 8123);

    let outcome = facade
        .develop_until(sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    assert!(outcome.build.is_success());
    assert_eq!(outcome.watch.runs, 0);
    assert_eq!(server.started(), vec![(root.join("build"), 8123)]);
    assert!(root.join("build/index.html").exists());
}
