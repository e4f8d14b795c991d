use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assetdag::actions::ActionContext;
use assetdag::config::ProjectSection;
use assetdag::dag::{PlanScope, Scheduler, TaskRegistry, TaskRunState};
use assetdag::errors::{ActionError, AssetdagError};
use assetdag_test_utils::fakes::{Behaviour, EventLog, recording_registry};
use assetdag_test_utils::{init_tracing, with_timeout};

const DEFAULT_GRAPH: &[(&str, &[&str])] = &[
    ("styles", &[]),
    ("lint", &["styles"]),
    ("scripts", &["styles"]),
    ("images", &["styles"]),
    ("default", &["lint", "scripts", "images"]),
];

fn scheduler(registry: TaskRegistry) -> Scheduler {
    let ctx = ActionContext::new(std::env::temp_dir(), ProjectSection::default());
    Scheduler::new(Arc::new(registry), Arc::new(ctx))
}

fn delayed(ms: u64) -> Behaviour {
    Behaviour {
        delay: Duration::from_millis(ms),
        fail: None,
    }
}

#[tokio::test]
async fn default_target_runs_styles_before_its_dependents() {
    init_tracing();
    let log = EventLog::new();
    let behaviours = BTreeMap::from([
        ("styles", delayed(30)),
        ("lint", delayed(20)),
        ("scripts", delayed(20)),
        ("images", delayed(20)),
    ]);
    let registry = recording_registry(DEFAULT_GRAPH, &behaviours, &log).unwrap();
    let scheduler = scheduler(registry);

    let report = with_timeout(scheduler.run("default")).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(
        report.batches(),
        &[
            vec!["styles".to_string()],
            vec!["images".to_string(), "lint".to_string(), "scripts".to_string()],
            vec!["default".to_string()],
        ]
    );
    for sibling in ["lint", "scripts", "images"] {
        assert!(log.finished_before_started("styles", sibling));
        assert!(log.finished_before_started(sibling, "default"));
    }
    assert_eq!(log.finished().len(), 5);
}

#[tokio::test]
async fn tasks_in_one_batch_run_concurrently() {
    let log = EventLog::new();
    let behaviours = BTreeMap::from([
        ("lint", delayed(80)),
        ("scripts", delayed(80)),
        ("images", delayed(80)),
    ]);
    let registry = recording_registry(DEFAULT_GRAPH, &behaviours, &log).unwrap();

    with_timeout(scheduler(registry).run("default")).await.unwrap();

    assert!(log.overlapped("lint", "scripts"));
    assert!(log.overlapped("scripts", "images"));
}

#[tokio::test]
async fn failing_task_stops_the_run_and_is_named() {
    init_tracing();
    let log = EventLog::new();
    let behaviours = BTreeMap::from([(
        "scripts",
        Behaviour {
            delay: Duration::ZERO,
            fail: Some("SyntaxError: unexpected token".to_string()),
        },
    )]);
    let registry = recording_registry(DEFAULT_GRAPH, &behaviours, &log).unwrap();
    let scheduler = scheduler(registry);

    let err = with_timeout(scheduler.run("default")).await.unwrap_err();

    assert_eq!(err.failed_task(), Some("scripts"));
    match &err {
        AssetdagError::TaskFailed { source, .. } => {
            assert!(matches!(source, ActionError::Tool { .. }));
            assert!(source.to_string().contains("SyntaxError"));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    assert!(err.to_string().contains("task 'scripts' failed"));
    assert!(!log.started().contains(&"default".to_string()));
}

#[tokio::test]
async fn failure_report_marks_later_batches_not_started() {
    let log = EventLog::new();
    let behaviours = BTreeMap::from([
        (
            "scripts",
            Behaviour {
                delay: Duration::ZERO,
                fail: Some("boom".to_string()),
            },
        ),
        ("images", delayed(500)),
    ]);
    let registry = recording_registry(DEFAULT_GRAPH, &behaviours, &log).unwrap();
    let scheduler = scheduler(registry);
    let plan = scheduler
        .plan(&["default"], PlanScope::WithPrerequisites)
        .unwrap();

    let failure = with_timeout(scheduler.execute(&plan)).await.unwrap_err();

    assert_eq!(failure.task, "scripts");
    let report = &failure.report;
    assert_eq!(report.failed_task(), Some("scripts"));
    assert_eq!(report.state_of("styles"), Some(TaskRunState::Succeeded));
    assert_eq!(report.state_of("scripts"), Some(TaskRunState::Failed));
    assert_eq!(report.state_of("images"), Some(TaskRunState::Aborted));
    assert_eq!(report.state_of("default"), Some(TaskRunState::NotStarted));
    assert!(!log.finished().contains(&"images".to_string()));
}

#[tokio::test]
async fn unknown_target_fails_before_anything_runs() {
    let log = EventLog::new();
    let registry = recording_registry(DEFAULT_GRAPH, &BTreeMap::new(), &log).unwrap();

    let err = scheduler(registry).run("deploy").await.unwrap_err();

    assert!(matches!(err, AssetdagError::TaskNotFound(ref t) if t == "deploy"));
    assert!(log.marks().is_empty());
}

#[tokio::test]
async fn targets_only_scope_skips_prerequisites() {
    let log = EventLog::new();
    let registry = recording_registry(DEFAULT_GRAPH, &BTreeMap::new(), &log).unwrap();

    let report = scheduler(registry)
        .run_targets(&["scripts", "default"], PlanScope::TargetsOnly)
        .await
        .unwrap();

    assert_eq!(
        report.batches(),
        &[vec!["scripts".to_string()], vec!["default".to_string()]]
    );
    assert_eq!(log.started(), vec!["scripts", "default"]);
}

#[tokio::test]
async fn each_run_gets_a_fresh_id() {
    let log = EventLog::new();
    let registry = recording_registry(DEFAULT_GRAPH, &BTreeMap::new(), &log).unwrap();
    let scheduler = scheduler(registry);

    let first = scheduler.run("styles").await.unwrap();
    let second = scheduler.clone().run("styles").await.unwrap();

    assert_eq!(first.run_id() + 1, second.run_id());
}
