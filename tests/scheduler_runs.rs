mod common;

use std::sync::Arc;
use std::time::Duration;

use taskforge::dag::{Task, TaskGraph, TaskState};
use taskforge::engine::{RunStatus, Scheduler, TaskFailure};
use taskforge::errors::GraphError;
use taskforge_test_utils::collaborators::RecordingNotifier;
use taskforge_test_utils::tasks::{failing_task, logged_task, TaskLog};

use common::{init_tracing, scheduler_with, GraphBuilder};

const STEP: Duration = Duration::from_millis(40);

fn site_graph(log: &TaskLog, failing: Option<&str>) -> TaskGraph {
    let body = |name: &str| match failing {
        Some(f) if f == name => failing_task(log, name, "compiler exploded"),
        _ => logged_task(log, name, STEP),
    };
    GraphBuilder::new()
        .task("clean", &[], body("clean"))
        .task("html", &["clean"], body("html"))
        .task("scripts", &["clean"], body("scripts"))
        .task("styles", &["clean"], body("styles"))
        .task("statics", &["clean"], body("statics"))
        .task("publish", &["html", "scripts", "styles", "statics"], body("publish"))
        .build()
}

#[tokio::test]
async fn stages_are_separated_by_a_barrier() {
    init_tracing();
    let log = TaskLog::new();
    let scheduler = Scheduler::with_log_notifier(Arc::new(site_graph(&log, None)));

    let outcome = scheduler.run(&["publish"]).await.unwrap();

    assert_eq!(outcome.status(), RunStatus::Succeeded);
    assert_eq!(
        outcome.stages,
        vec![
            vec!["clean".to_string()],
            vec!["html".into(), "scripts".into(), "styles".into(), "statics".into()],
            vec!["publish".into()],
        ]
    );

    let events = log.events();
    let pos = |e: &str| events.iter().position(|x| x == e).unwrap();
    for task in ["html", "scripts", "styles", "statics"] {
        assert!(pos("end:clean") < pos(&format!("start:{task}")));
        assert!(pos(&format!("end:{task}")) < pos("start:publish"));
    }
    assert!(log.max_concurrency() >= 2, "stage tasks should overlap");
}

#[tokio::test]
async fn failed_stage_finishes_but_later_stages_are_skipped() {
    init_tracing();
    let log = TaskLog::new();
    let scheduler = Scheduler::with_log_notifier(Arc::new(site_graph(&log, Some("scripts"))));

    let outcome = scheduler.run(&["publish"]).await.unwrap();

    assert_eq!(outcome.status(), RunStatus::Failed);
    assert_eq!(outcome.failed_tasks(), vec!["scripts"]);
    assert_eq!(
        outcome.failure_of("scripts"),
        Some(&TaskFailure::Io("compiler exploded".into()))
    );
    assert_eq!(outcome.skipped, vec!["publish".to_string()]);
    assert_eq!(outcome.state_of("publish"), Some(TaskState::Pending));

    // No mid-stage cancellation: siblings of the failed task completed.
    for task in ["html", "styles", "statics"] {
        assert_eq!(outcome.state_of(task), Some(TaskState::Succeeded));
        assert!(log.events().contains(&format!("end:{task}")));
    }
    assert_eq!(log.count_started("publish"), 0);
}

#[tokio::test]
async fn every_invocation_reruns_its_closure() {
    let log = TaskLog::new();
    let scheduler = Scheduler::with_log_notifier(Arc::new(site_graph(&log, None)));

    let first = scheduler.run(&["html"]).await.unwrap();
    let second = scheduler.run(&["html", "html"]).await.unwrap();

    assert!(second.run_id > first.run_id);
    assert_eq!(log.count_started("clean"), 2);
    assert_eq!(log.count_started("html"), 2);
    assert_eq!(log.count_started("styles"), 0);
}

#[tokio::test]
async fn unknown_root_runs_nothing() {
    let log = TaskLog::new();
    let scheduler = Scheduler::with_log_notifier(Arc::new(site_graph(&log, None)));

    let err = scheduler.run(&["html", "sprites"]).await.unwrap_err();

    assert_eq!(err, GraphError::UnknownTask("sprites".into()));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn only_successful_reload_tasks_notify() {
    init_tracing();
    let log = TaskLog::new();
    let mut graph = TaskGraph::new();
    graph
        .register_task(Task::new("clean", &[], logged_task(&log, "clean", STEP)))
        .unwrap();
    graph
        .register_task(Task::new("html", &["clean"], logged_task(&log, "html", STEP)).with_reload(true))
        .unwrap();
    graph
        .register_task(Task::new("styles", &["clean"], failing_task(&log, "styles", "bad.less")).with_reload(true))
        .unwrap();
    graph
        .register_task(Task::new("lint", &["clean"], logged_task(&log, "lint", STEP)))
        .unwrap();
    graph.validate().unwrap();

    let notifier = RecordingNotifier::new();
    let scheduler = scheduler_with(graph, Arc::new(notifier.clone()));

    let outcome = scheduler.run(&["html", "styles", "lint"]).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(notifier.notified(), vec!["html".to_string()]);
}
