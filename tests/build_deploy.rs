#![cfg(unix)]

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskforge::config::ConfigFile;
use taskforge::config::model::StepConfig;
use taskforge::engine::TaskFailure;
use taskforge::errors::DeployError;
use taskforge::fs::mock::MockFileSystem;
use taskforge_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use taskforge_test_utils::collaborators::{RecordingNotifier, RecordingPublisher};

use common::{init_tracing, mock_facade, target};

/// Fails any stylesheet containing `BROKEN`, passes the rest through.
const FAKE_LESSC: &str =
    "if grep -q BROKEN; then echo 'ParseError: unexpected token' >&2; exit 1; else cat; fi";

fn site_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_phases(&[&["clean"], &["html", "scripts", "styles"]])
        .with_task("clean", TaskConfigBuilder::clean(&[]).build())
        .with_task("clean-html", TaskConfigBuilder::clean(&["**/*.html"]).build())
        .with_task(
            "html",
            TaskConfigBuilder::pipeline(&["**/*.html"])
                .after("clean-html")
                .dest("")
                .reload(true)
                .build(),
        )
        .with_task(
            "scripts",
            TaskConfigBuilder::pipeline(&["scripts/**/*.js"])
                .concat("bundle.js")
                .dest("scripts")
                .build(),
        )
        .with_task(
            "styles",
            TaskConfigBuilder::pipeline(&["styles/*.less"])
                .step(StepConfig::Command {
                    cmd: FAKE_LESSC.to_string(),
                })
                .rename("css")
                .dest("styles")
                .reload(true)
                .build(),
        )
        .build()
}

fn site_files(root: &Path, broken_style: bool) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(root.join("app/index.html"), "<h1>home</h1>");
    fs.add_file(root.join("app/about/team.html"), "<h1>team</h1>");
    // Added out of order on purpose.
    fs.add_file(root.join("app/scripts/widgets/b.js"), "// b");
    fs.add_file(root.join("app/scripts/a.js"), "// a");
    fs.add_file(root.join("app/styles/main.less"), "body { color: red; }");
    if broken_style {
        fs.add_file(root.join("app/styles/bad.less"), "BROKEN {");
    }
    fs.add_file(root.join("build/stale.txt"), "left over");
    fs
}

#[tokio::test]
async fn build_wipes_output_then_writes_every_task() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let fs = site_files(root, false);
    let notifier = RecordingNotifier::new();
    let facade = mock_facade(&site_config(), root, &fs, Arc::new(notifier.clone()));

    let outcome = facade.build().await.unwrap();

    assert!(outcome.is_success(), "{}", outcome.describe_failures());
    assert_eq!(outcome.phases.len(), 2);
    assert_eq!(outcome.phases[0].stages, vec![vec!["clean".to_string()]]);
    assert_eq!(
        outcome.phases[1].stages,
        vec![
            vec!["clean-html".to_string(), "scripts".into(), "styles".into()],
            vec!["html".to_string()],
        ]
    );

    let build = root.join("build");
    assert_eq!(
        fs.file_paths(),
        {
            let mut expected: Vec<PathBuf> = vec![
                root.join("app/index.html"),
                root.join("app/about/team.html"),
                root.join("app/scripts/widgets/b.js"),
                root.join("app/scripts/a.js"),
                root.join("app/styles/main.less"),
                build.join("index.html"),
                build.join("about/team.html"),
                build.join("scripts/bundle.js"),
                build.join("styles/main.css"),
            ];
            expected.sort();
            expected
        }
    );
    // Path-sorted, independent of discovery order.
    assert_eq!(fs.contents(build.join("scripts/bundle.js")), Some(b"// a\n// b".to_vec()));
    assert_eq!(
        fs.contents(build.join("styles/main.css")),
        Some(b"body { color: red; }".to_vec())
    );

    let mut notified = notifier.notified();
    notified.sort();
    assert_eq!(notified, vec!["html".to_string(), "styles".to_string()]);
}

#[tokio::test]
async fn broken_stylesheet_fails_only_itself() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let fs = site_files(root, true);
    let facade = mock_facade(&site_config(), root, &fs, Arc::new(RecordingNotifier::new()));

    let outcome = facade.build().await.unwrap();
    let failed = outcome.failed_phase().expect("styles should fail");

    assert_eq!(failed.failed_tasks(), vec!["styles"]);
    let Some(TaskFailure::Transforms(errors)) = failed.failure_of("styles") else {
        panic!("expected transform errors, got {:?}", failed.failure_of("styles"));
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, PathBuf::from("styles/bad.less"));
    assert!(errors[0].message.contains("ParseError"), "{}", errors[0].message);

    let build = root.join("build");
    assert!(fs.contents(build.join("styles/main.css")).is_some());
    assert!(fs.contents(build.join("styles/bad.css")).is_none());
    assert!(fs.contents(build.join("index.html")).is_some());
    assert!(fs.contents(build.join("scripts/bundle.js")).is_some());
}

#[tokio::test]
async fn failed_build_is_never_published() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let fs = site_files(root, true);
    let publisher = RecordingPublisher::new();
    let facade = mock_facade(&site_config(), root, &fs, Arc::new(RecordingNotifier::new()))
        .with_publisher(Arc::new(publisher.clone()), target());

    let err = facade.deploy().await.unwrap_err();

    let DeployError::Build(outcome) = err else {
        panic!("expected a build failure, got {err}");
    };
    assert_eq!(outcome.failed_tasks(), vec!["styles"]);
    assert!(publisher.calls().is_empty());
}

#[tokio::test]
async fn successful_build_is_published_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let fs = site_files(root, false);
    let publisher = RecordingPublisher::new();
    let facade = mock_facade(&site_config(), root, &fs, Arc::new(RecordingNotifier::new()))
        .with_publisher(Arc::new(publisher.clone()), target());

    let outcome = facade.deploy().await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(publisher.calls(), vec![(root.join("build"), target())]);
}

#[tokio::test]
async fn publish_failure_is_reported_with_its_target() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let fs = site_files(root, false);
    let publisher = RecordingPublisher::failing("connection refused");
    let facade = mock_facade(&site_config(), root, &fs, Arc::new(RecordingNotifier::new()))
        .with_publisher(Arc::new(publisher.clone()), target());

    let err = facade.deploy().await.unwrap_err();

    let DeployError::Publish(publish) = err else {
        panic!("expected a publish failure, got {err}");
    };
    assert_eq!(publish.target, target());
    assert!(publish.to_string().contains("connection refused"));
    assert_eq!(publisher.calls().len(), 1);
}

fn lint_config(tolerate: bool) -> ConfigFile {
    ConfigFileBuilder::new()
        .with_phases(&[&["lint"]])
        .with_task(
            "lint",
            TaskConfigBuilder::pipeline(&["**/*.js"])
                .step(StepConfig::Check {
                    cmd: "! grep -q debugger".to_string(),
                })
                .tolerate_errors(tolerate)
                .build(),
        )
        .build()
}

#[tokio::test]
async fn lint_writes_nothing_and_can_tolerate_errors() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let fs = MockFileSystem::new();
    fs.add_file(root.join("app/a.js"), "let a = 1;");
    fs.add_file(root.join("app/b.js"), "debugger;");

    let strict = mock_facade(&lint_config(false), root, &fs, Arc::new(RecordingNotifier::new()));
    let outcome = strict.run_task("lint").await.unwrap();
    assert_eq!(outcome.failed_tasks(), vec!["lint"]);
    assert!(matches!(
        outcome.failure_of("lint"),
        Some(TaskFailure::Transforms(errors)) if errors.len() == 1 && errors[0].path == Path::new("b.js")
    ));

    let lenient = mock_facade(&lint_config(true), root, &fs, Arc::new(RecordingNotifier::new()));
    let outcome = lenient.run_task("lint").await.unwrap();
    assert!(outcome.is_success());
    assert!(outcome.written.is_empty());

    assert_eq!(fs.file_paths().len(), 2);
}
