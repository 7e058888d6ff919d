mod common;

use std::path::Path;
use std::sync::Arc;

use taskforge::collab::LogNotifier;
use taskforge::config::{load_and_validate, ConfigFile};
use taskforge::facade::{BuildFacade, Command};
use taskforge::fs::mock::MockFileSystem;
use taskforge::tasks::outputs::{claims_of, find_overlaps};
use taskforge::tasks::{build_graph, BuildEnv};

fn shipped() -> ConfigFile {
    load_and_validate(Path::new(env!("CARGO_MANIFEST_DIR")).join("Taskforge.toml"))
        .expect("shipped Taskforge.toml must load")
}

#[test]
fn shipped_config_builds_a_valid_graph() {
    let cfg = shipped();
    let env = BuildEnv::from_config(&cfg, Path::new("/site"), Arc::new(MockFileSystem::new()));
    let graph = build_graph(&cfg, &env).unwrap();

    assert_eq!(
        graph.task_names().collect::<Vec<_>>(),
        vec![
            "clean",
            "clean-html",
            "html",
            "clean-scripts",
            "scripts",
            "clean-styles",
            "styles",
            "statics",
            "lint"
        ]
    );
    assert!(find_overlaps(&cfg, &graph).unwrap().is_empty());
}

#[test]
fn build_phase_tasks_declare_pairwise_disjoint_outputs() {
    let cfg = shipped();

    for phase in &cfg.build.phases {
        let claims: Vec<_> = phase
            .iter()
            .filter_map(|name| cfg.task.get(name).map(|t| (name, claims_of(t))))
            .flat_map(|(name, claims)| claims.into_iter().map(move |c| (name, c)))
            .collect();

        for (i, (a_name, a)) in claims.iter().enumerate() {
            for (b_name, b) in &claims[i + 1..] {
                assert!(!a.overlaps(b), "{a_name} and {b_name} overlap: {a:?} / {b:?}");
            }
        }
    }
}

#[test]
fn dry_run_shows_phase_stages() {
    let cfg = shipped();
    let facade = BuildFacade::from_config_with(
        &cfg,
        Path::new("/site"),
        Arc::new(MockFileSystem::new()),
        Arc::new(LogNotifier),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let text = facade.describe_plan(&Command::Build).unwrap();
    assert!(text.contains("phase 0:\n  stage 0: clean\n"), "{text}");
    assert!(
        text.contains(
            "phase 1:\n  stage 0: clean-html, clean-scripts, clean-styles, statics\n  stage 1: html, scripts, styles\n"
        ),
        "{text}"
    );

    let watch = facade.describe_plan(&Command::Watch).unwrap();
    assert!(watch.contains("watch subscriptions (4):"), "{watch}");
    assert!(watch.contains("**/*.js -> scripts, lint"), "{watch}");

    let single = facade.plan(&Command::from("lint")).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].stages(), &[vec!["lint".to_string()]]);
}
