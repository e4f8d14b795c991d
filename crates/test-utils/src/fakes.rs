#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use assetdag::actions::audit::AuditFuture;
use assetdag::actions::{ActionContext, ActionFuture, AuditReport, RemoteAuditor, TaskAction};
use assetdag::dag::TaskRegistry;
use assetdag::engine::{RebuildOutcome, RebuildRequest, RuntimeEvent};
use assetdag::errors::{ActionError, Result};
use assetdag::exec::{Rebuilder, ToolFuture, ToolInvocation, ToolRunner};
use assetdag::types::AuditStrategy;

/// Start/finish markers recorded by [`RecordingAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Started(String),
    Finished(String),
}

/// Shared, ordered log of task starts and finishes.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Vec<Mark>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, mark: Mark) {
        self.inner.lock().unwrap().push(mark);
    }

    pub fn marks(&self) -> Vec<Mark> {
        self.inner.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.marks()
            .into_iter()
            .filter_map(|m| match m {
                Mark::Started(n) => Some(n),
                Mark::Finished(_) => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<String> {
        self.marks()
            .into_iter()
            .filter_map(|m| match m {
                Mark::Finished(n) => Some(n),
                Mark::Started(_) => None,
            })
            .collect()
    }

    pub fn position(&self, mark: &Mark) -> Option<usize> {
        self.marks().iter().position(|m| m == mark)
    }

    /// True if `a` finished before `b` started.
    pub fn finished_before_started(&self, a: &str, b: &str) -> bool {
        match (
            self.position(&Mark::Finished(a.to_string())),
            self.position(&Mark::Started(b.to_string())),
        ) {
            (Some(fa), Some(sb)) => fa < sb,
            _ => false,
        }
    }

    /// True if `a` and `b` were running at the same time.
    pub fn overlapped(&self, a: &str, b: &str) -> bool {
        let pos = |m: Mark| self.position(&m);
        match (
            pos(Mark::Started(a.to_string())),
            pos(Mark::Finished(a.to_string())),
            pos(Mark::Started(b.to_string())),
            pos(Mark::Finished(b.to_string())),
        ) {
            (Some(sa), Some(fa), Some(sb), Some(fb)) => sa < fb && sb < fa,
            _ => false,
        }
    }
}

/// Test action that logs its start and finish, optionally sleeping and
/// optionally failing.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    log: EventLog,
    delay: Duration,
    failure: Option<String>,
}

impl RecordingAction {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

impl TaskAction for RecordingAction {
    fn run<'a>(&'a self, task: &'a str, _ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            self.log.push(Mark::Started(task.to_string()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(message) = &self.failure {
                return Err(ActionError::tool(task, message.clone()));
            }
            self.log.push(Mark::Finished(task.to_string()));
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

/// Per-task behaviour for [`recording_registry`].
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    pub delay: Duration,
    pub fail: Option<String>,
}

/// Registry of [`RecordingAction`]s from `(name, prerequisites)` pairs.
pub fn recording_registry(
    edges: &[(&str, &[&str])],
    behaviours: &BTreeMap<&str, Behaviour>,
    log: &EventLog,
) -> Result<TaskRegistry> {
    let mut builder = TaskRegistry::builder();
    for (name, after) in edges {
        let mut action = RecordingAction::new(log.clone());
        if let Some(b) = behaviours.get(name) {
            action = action.with_delay(b.delay);
            if let Some(msg) = &b.fail {
                action = action.failing(msg);
            }
        }
        builder.register(
            name.to_string(),
            after.iter().map(|d| d.to_string()).collect(),
            Arc::new(action),
        )?;
    }
    builder.build()
}

/// Fake [`ToolRunner`] that never spawns processes.
///
/// - With an input and an output: copies input bytes to the output.
/// - With only an output: writes the rendered command to it.
/// - Commands containing a configured fragment fail with exit code 1.
#[derive(Debug, Clone, Default)]
pub struct CountingTools {
    calls: Arc<AtomicUsize>,
    invocations: Arc<Mutex<Vec<ToolInvocation>>>,
    fail_on: Option<String>,
}

impl CountingTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.command).collect()
    }
}

impl ToolRunner for CountingTools {
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> ToolFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.invocations.lock().unwrap().push(invocation.clone());

            if let Some(fragment) = &self.fail_on {
                if invocation.command.contains(fragment.as_str()) {
                    return Err(ActionError::tool(&invocation.command, "exit code 1"));
                }
            }

            if let Some(output) = &invocation.output {
                let bytes = match &invocation.input {
                    Some(input) => tokio::fs::read(input)
                        .await
                        .map_err(|e| ActionError::fs(input, e))?,
                    None => invocation.command.clone().into_bytes(),
                };
                if let Some(parent) = output.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| ActionError::fs(parent, e))?;
                }
                tokio::fs::write(output, bytes)
                    .await
                    .map_err(|e| ActionError::fs(output, e))?;
            }
            Ok(())
        })
    }
}

/// Fake [`RemoteAuditor`] returning a fixed score or a network error.
#[derive(Debug, Clone)]
pub struct FakeAuditor {
    score: Option<f64>,
    calls: Arc<Mutex<Vec<(String, AuditStrategy)>>>,
}

impl FakeAuditor {
    pub fn scoring(score: f64) -> Self {
        Self {
            score: Some(score),
            calls: Arc::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            score: None,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, AuditStrategy)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteAuditor for FakeAuditor {
    fn audit<'a>(&'a self, url: &'a str, strategy: AuditStrategy) -> AuditFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push((url.to_string(), strategy));
            match self.score {
                Some(score) => Ok(AuditReport {
                    url: url.to_string(),
                    strategy,
                    score,
                }),
                None => Err(ActionError::Network(format!("{url} unreachable"))),
            }
        })
    }
}

/// Fake [`Rebuilder`] that records requests and immediately reports them
/// finished, failing when a request contains one of `failing_tasks`.
pub struct FakeRebuilder {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    requests: Arc<Mutex<Vec<RebuildRequest>>>,
    failing_tasks: Vec<String>,
    delay: Duration,
}

impl FakeRebuilder {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        requests: Arc<Mutex<Vec<RebuildRequest>>>,
    ) -> Self {
        Self {
            runtime_tx,
            requests,
            failing_tasks: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn failing_on(mut self, task: &str) -> Self {
        self.failing_tasks.push(task.to_string());
        self
    }

    /// Report completion after `delay` instead of immediately.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Rebuilder for FakeRebuilder {
    fn start_rebuild(
        &mut self,
        request: RebuildRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let requests = Arc::clone(&self.requests);
        let failing = self
            .failing_tasks
            .iter()
            .find(|t| request.tasks.contains(t))
            .cloned();
        let delay = self.delay;

        Box::pin(async move {
            requests.lock().unwrap().push(request.clone());
            let outcome = match failing {
                Some(task) => RebuildOutcome::Failed {
                    task: Some(task),
                    message: "fake failure".to_string(),
                },
                None => RebuildOutcome::Success,
            };
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = tx
                    .send(RuntimeEvent::RebuildFinished {
                        rebuild_id: request.id,
                        outcome,
                    })
                    .await;
            });
            Ok(())
        })
    }
}
