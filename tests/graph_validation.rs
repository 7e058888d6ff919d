mod common;

use std::path::Path;
use std::sync::Arc;

use taskforge::collab::LogNotifier;
use taskforge::dag::TaskGraph;
use taskforge::errors::{ForgeError, GraphError};
use taskforge::facade::BuildFacade;
use taskforge::fs::mock::MockFileSystem;
use taskforge_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use taskforge_test_utils::tasks::noop_task;

#[test]
fn cycle_is_reported_in_dependency_order() {
    let mut graph = TaskGraph::new();
    graph.register("lint", &[], noop_task()).unwrap();
    graph.register("a", &["b"], noop_task()).unwrap();
    graph.register("b", &["c"], noop_task()).unwrap();
    graph.register("c", &["a"], noop_task()).unwrap();

    let err = graph.validate().unwrap_err();
    assert_eq!(err, GraphError::Cycle(vec!["a".into(), "b".into(), "c".into()]));
    assert_eq!(err.to_string(), "cycle detected in task graph: a -> b -> c -> a");
}

#[test]
fn duplicate_registration_leaves_graph_unchanged() {
    let mut graph = TaskGraph::new();
    graph.register("html", &[], noop_task()).unwrap();

    let err = graph.register("html", &["clean"], noop_task()).unwrap_err();

    assert_eq!(err, GraphError::DuplicateTask("html".into()));
    assert_eq!(graph.len(), 1);
    assert!(graph.dependencies_of("html").is_empty());
    graph.validate().unwrap();
}

#[test]
fn first_unknown_dependency_wins() {
    let mut graph = TaskGraph::new();
    graph.register("html", &["clean-html"], noop_task()).unwrap();
    graph.register("styles", &["ghost"], noop_task()).unwrap();

    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::UnknownDependency {
            task: "html".into(),
            dependency: "clean-html".into()
        }
    );
}

#[test]
fn invalid_graph_fails_before_any_file_is_touched() {
    let cfg = ConfigFileBuilder::new()
        .with_phases(&[&["html"]])
        .with_task("clean", TaskConfigBuilder::clean(&[]).after("html").build())
        .with_task("html", TaskConfigBuilder::pipeline(&["**/*.html"]).after("clean").dest("").build())
        .build();
    let fs = MockFileSystem::new();
    fs.add_file("/site/app/index.html", "<p>hi</p>");
    fs.add_file("/site/build/old.html", "stale");

    let err = BuildFacade::from_config_with(&cfg, Path::new("/site"), Arc::new(fs.clone()), Arc::new(LogNotifier))
        .err()
        .expect("cycle must be rejected");

    assert!(matches!(err, ForgeError::Graph(GraphError::Cycle(_))));
    assert_eq!(
        fs.file_paths(),
        vec![Path::new("/site/app/index.html").to_path_buf(), Path::new("/site/build/old.html").to_path_buf()]
    );
}

#[test]
fn overlapping_outputs_in_one_stage_are_rejected() {
    let cfg = ConfigFileBuilder::new()
        .with_phases(&[&["html", "pages"]])
        .with_task("html", TaskConfigBuilder::pipeline(&["**/*.html"]).dest("").build())
        .with_task("pages", TaskConfigBuilder::pipeline(&["pages/**/*"]).dest("pages").build())
        .build();

    let err = BuildFacade::from_config_with(
        &cfg,
        Path::new("/site"),
        Arc::new(MockFileSystem::new()),
        Arc::new(LogNotifier),
    )
    .err()
    .expect("overlap must be rejected");

    let msg = err.to_string();
    assert!(msg.contains("'html' and 'pages'"), "{msg}");
}

#[test]
fn output_root_resolving_onto_sources_is_rejected() {
    let cfg = ConfigFileBuilder::new()
        .with_roots("app", "/site/app")
        .with_phases(&[&["clean"]])
        .with_task("clean", TaskConfigBuilder::clean(&[]).build())
        .build();
    let fs = MockFileSystem::new();
    fs.add_file("/site/app/index.html", "<p>hi</p>");

    let err = BuildFacade::from_config_with(&cfg, Path::new("/site"), Arc::new(fs.clone()), Arc::new(LogNotifier))
        .err()
        .expect("output inside source must be rejected");

    assert!(matches!(err, ForgeError::ConfigError(ref msg) if msg.contains("must not overlap")), "{err}");
    assert_eq!(fs.file_paths(), vec![Path::new("/site/app/index.html").to_path_buf()]);
}

#[test]
fn clean_racing_a_writer_in_one_stage_is_rejected() {
    let cfg = ConfigFileBuilder::new()
        .with_phases(&[&["clean-scripts", "scripts"]])
        .with_task("clean-scripts", TaskConfigBuilder::clean(&["**/*.js"]).build())
        .with_task("scripts", TaskConfigBuilder::pipeline(&["**/*.js"]).dest("").build())
        .build();

    let err = BuildFacade::from_config_with(
        &cfg,
        Path::new("/site"),
        Arc::new(MockFileSystem::new()),
        Arc::new(LogNotifier),
    )
    .err()
    .expect("clean and writer of the same files must not share a stage");

    let msg = err.to_string();
    assert!(msg.contains("'clean-scripts' and 'scripts'"), "{msg}");
}

#[test]
fn clean_ordered_before_its_writer_is_accepted() {
    let cfg = ConfigFileBuilder::new()
        .with_phases(&[&["scripts"]])
        .with_task("clean-scripts", TaskConfigBuilder::clean(&["**/*.js"]).build())
        .with_task("scripts", TaskConfigBuilder::pipeline(&["**/*.js"]).after("clean-scripts").dest("").build())
        .build();

    BuildFacade::from_config_with(&cfg, Path::new("/site"), Arc::new(MockFileSystem::new()), Arc::new(LogNotifier))
        .unwrap_or_else(|e| panic!("{e}"));
}
