use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::actions::ActionContext;
use assetdag::config::ProjectSection;
use assetdag::dag::Scheduler;
use assetdag::engine::{
    BindingInfo, CoreRuntime, RebuildRequest, Runtime, RuntimeEvent, RuntimeOptions,
    TriggerReason,
};
use assetdag::config::BindingConfig;
use assetdag::exec::SchedulerRebuilder;
use assetdag::watch::{build_watch_bindings, spawn_watcher};
use assetdag::serve::ReloadHub;
use assetdag_test_utils::fakes::{Behaviour, EventLog, FakeRebuilder, recording_registry};
use assetdag_test_utils::{init_tracing, with_timeout};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::mpsc;

fn bindings() -> Vec<BindingInfo> {
    vec![
        BindingInfo {
            tasks: vec!["styles".into()],
            reload: true,
        },
        BindingInfo {
            tasks: vec!["scripts".into()],
            reload: true,
        },
        BindingInfo {
            tasks: vec!["images".into()],
            reload: false,
        },
    ]
}

fn exit_when_idle() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

fn trigger(binding: usize) -> RuntimeEvent {
    RuntimeEvent::BindingTriggered {
        binding,
        reason: TriggerReason::FileWatch,
    }
}

struct Harness {
    tx: mpsc::Sender<RuntimeEvent>,
    rx: mpsc::Receiver<RuntimeEvent>,
    requests: Arc<Mutex<Vec<RebuildRequest>>>,
    hub: ReloadHub,
}

impl Harness {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            tx,
            rx,
            requests: Arc::default(),
            hub: ReloadHub::default(),
        }
    }

    fn rebuilder(&self) -> FakeRebuilder {
        FakeRebuilder::new(self.tx.clone(), Arc::clone(&self.requests))
    }
}

#[tokio::test]
async fn one_change_gives_one_rebuild_and_one_reload() {
    init_tracing();
    let h = Harness::new();
    let mut reloads = h.hub.subscribe();
    h.tx.send(trigger(0)).await.unwrap();
    let rebuilder = h.rebuilder();

    let core = CoreRuntime::new(bindings(), 1, exit_when_idle());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    let requests = requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tasks, vec!["styles".to_string()]);

    let notice = reloads.try_recv().unwrap();
    assert_eq!(notice.rebuild_id, requests[0].id);
    assert_eq!(notice.tasks, vec!["styles".to_string()]);
    assert!(matches!(reloads.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn failed_rebuild_sends_no_reload() {
    let h = Harness::new();
    let mut reloads = h.hub.subscribe();
    h.tx.send(trigger(0)).await.unwrap();
    let rebuilder = h.rebuilder().failing_on("styles");

    let core = CoreRuntime::new(bindings(), 1, exit_when_idle());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    assert_eq!(requests.lock().unwrap().len(), 1);
    assert!(matches!(reloads.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn binding_without_reload_rebuilds_silently() {
    let h = Harness::new();
    let mut reloads = h.hub.subscribe();
    h.tx.send(trigger(2)).await.unwrap();
    let rebuilder = h.rebuilder();

    let core = CoreRuntime::new(bindings(), 1, exit_when_idle());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    assert_eq!(requests.lock().unwrap()[0].tasks, vec!["images".to_string()]);
    assert!(matches!(reloads.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn triggers_during_a_rebuild_are_coalesced() {
    let h = Harness::new();
    let mut reloads = h.hub.subscribe();
    for binding in [0, 0, 1, 0, 1] {
        h.tx.send(trigger(binding)).await.unwrap();
    }
    let rebuilder = h.rebuilder().with_delay(Duration::from_millis(50));

    let core = CoreRuntime::new(bindings(), 1, exit_when_idle());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    let requests = requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].bindings, vec![0]);
    assert_eq!(requests[1].bindings, vec![0, 1]);
    assert_eq!(
        requests[1].tasks,
        vec!["styles".to_string(), "scripts".to_string()]
    );

    assert_eq!(reloads.try_recv().unwrap().rebuild_id, requests[0].id);
    assert_eq!(reloads.try_recv().unwrap().rebuild_id, requests[1].id);
}

#[tokio::test]
async fn longer_queue_keeps_batches_apart() {
    let h = Harness::new();
    for binding in [0, 1, 2] {
        h.tx.send(trigger(binding)).await.unwrap();
    }
    let rebuilder = h.rebuilder().with_delay(Duration::from_millis(20));

    let core = CoreRuntime::new(bindings(), 3, exit_when_idle());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    let bindings: Vec<Vec<usize>> = requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.bindings.clone())
        .collect();
    assert_eq!(bindings, vec![vec![0], vec![1], vec![2]]);
}

#[tokio::test]
async fn edits_made_before_the_runtime_starts_are_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/styles")).unwrap();

    let h = Harness::new();
    let watch = build_watch_bindings(&[BindingConfig {
        patterns: vec!["src/styles/**/*.scss".into()],
        exclude: Vec::new(),
        tasks: vec!["styles".into()],
        reload: true,
    }])
    .unwrap();
    let _watcher =
        spawn_watcher(dir.path(), watch, Duration::from_millis(30), h.tx.clone()).unwrap();

    // The initial build is still running while the file changes.
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(dir.path().join("src/styles/main.scss"), "a { b: c }").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let rebuilder = h.rebuilder();
    let core = CoreRuntime::new(bindings(), 1, exit_when_idle());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    let requests = requests.lock().unwrap().clone();
    assert!(!requests.is_empty());
    assert_eq!(requests[0].tasks, vec!["styles".to_string()]);
}

#[tokio::test]
async fn shutdown_stops_the_runtime() {
    let h = Harness::new();
    h.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    let rebuilder = h.rebuilder();

    let core = CoreRuntime::new(bindings(), 1, RuntimeOptions::default());
    let requests = Arc::clone(&h.requests);
    with_timeout(Runtime::new(core, h.rx, rebuilder, h.hub.clone()).run())
        .await
        .unwrap();

    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reload_follows_task_completion_through_the_scheduler() {
    init_tracing();
    let log = EventLog::new();
    let behaviours = BTreeMap::from([(
        "styles",
        Behaviour {
            delay: Duration::from_millis(30),
            fail: None,
        },
    )]);
    let registry = recording_registry(
        &[("styles", &[]), ("scripts", &[]), ("images", &[]), ("default", &["styles"])],
        &behaviours,
        &log,
    )
    .unwrap();
    let ctx = ActionContext::new(std::env::temp_dir(), ProjectSection::default());
    let scheduler = Scheduler::new(Arc::new(registry), Arc::new(ctx));

    let (tx, rx) = mpsc::channel(16);
    let hub = ReloadHub::default();
    let mut reloads = hub.subscribe();
    let watcher_log = log.clone();
    let observer = tokio::spawn(async move {
        let notice = reloads.recv().await.unwrap();
        (notice, watcher_log.finished())
    });

    tx.send(trigger(0)).await.unwrap();
    let core = CoreRuntime::new(bindings(), 1, exit_when_idle());
    let rebuilder = SchedulerRebuilder::new(scheduler, tx.clone());
    with_timeout(Runtime::new(core, rx, rebuilder, hub).run())
        .await
        .unwrap();

    let (notice, finished_at_reload) = with_timeout(observer).await.unwrap();
    assert_eq!(notice.tasks, vec!["styles".to_string()]);
    assert_eq!(finished_at_reload, vec!["styles".to_string()]);
    // Watch rebuilds run only the bound task, not `default`.
    assert_eq!(log.started(), vec!["styles"]);
}
