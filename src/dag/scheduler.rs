// src/dag/scheduler.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, error, info, warn};

use crate::actions::ActionContext;
use crate::dag::plan::{ExecutionPlan, PlanScope};
use crate::dag::registry::{Task, TaskRegistry};
use crate::dag::report::{RunReport, TaskRunState};
use crate::engine::TaskName;
use crate::errors::{ActionError, AssetdagError, Result};

/// A run that stopped at a failing task.
#[derive(Debug)]
pub struct RunFailure {
    pub report: RunReport,
    pub task: TaskName,
    pub source: ActionError,
}

impl From<RunFailure> for AssetdagError {
    fn from(failure: RunFailure) -> Self {
        AssetdagError::TaskFailed {
            task: failure.task,
            source: failure.source,
        }
    }
}

/// Resolves targets into plans and executes them batch by batch.
///
/// - Batches run strictly in sequence.
/// - Tasks within a batch run concurrently on the calling task.
/// - The first failure cancels its in-flight siblings and no later batch
///   starts (fail-fast, no retry).
#[derive(Debug, Clone)]
pub struct Scheduler {
    registry: Arc<TaskRegistry>,
    ctx: Arc<ActionContext>,
    /// Monotonically increasing run ID, shared between clones.
    run_counter: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(registry: Arc<TaskRegistry>, ctx: Arc<ActionContext>) -> Self {
        Self {
            registry,
            ctx,
            run_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ActionContext {
        &self.ctx
    }

    /// Resolve a plan without running anything.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S], scope: PlanScope) -> Result<ExecutionPlan> {
        ExecutionPlan::resolve(self.registry.graph(), targets, scope)
    }

    /// Run a top-level target and all of its prerequisites.
    pub async fn run(&self, target: &str) -> Result<RunReport> {
        self.run_targets(&[target], PlanScope::WithPrerequisites)
            .await
    }

    pub async fn run_targets<S: AsRef<str> + Sync>(
        &self,
        targets: &[S],
        scope: PlanScope,
    ) -> Result<RunReport> {
        let plan = self.plan(targets, scope)?;
        Ok(self.execute(&plan).await?)
    }

    /// Execute an already-resolved plan.
    pub async fn execute(&self, plan: &ExecutionPlan) -> std::result::Result<RunReport, RunFailure> {
        let run_id = self.run_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        let mut report = RunReport::new(run_id, plan);

        info!(
            run_id,
            targets = ?plan.targets(),
            batches = plan.batches().len(),
            tasks = plan.len(),
            "starting run"
        );

        for (index, batch) in plan.batches().iter().enumerate() {
            debug!(run_id, batch = index, tasks = ?batch, "starting batch");

            let mut in_flight = FuturesUnordered::new();
            for name in batch {
                match self.registry.resolve(name) {
                    Ok(task) => {
                        report.set(name, TaskRunState::Running);
                        in_flight.push(self.run_task(run_id, task));
                    }
                    Err(err) => {
                        // Plans are resolved against this registry, so this
                        // only happens with a plan from somewhere else.
                        report.set(name, TaskRunState::Failed);
                        return Err(self.fail(
                            report,
                            started,
                            name.clone(),
                            ActionError::tool(name.clone(), err.to_string()),
                        ));
                    }
                }
            }

            let mut failure: Option<(TaskName, ActionError)> = None;
            while let Some((name, result)) = in_flight.next().await {
                match result {
                    Ok(()) => report.set(&name, TaskRunState::Succeeded),
                    Err(source) => {
                        report.set(&name, TaskRunState::Failed);
                        failure = Some((name, source));
                        break;
                    }
                }
            }
            // Dropping the set cancels siblings that are still running.
            drop(in_flight);

            if let Some((task, source)) = failure {
                return Err(self.fail(report, started, task, source));
            }
        }

        report.finish(started.elapsed());
        info!(
            run_id,
            tasks = plan.len(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "run finished successfully"
        );
        Ok(report)
    }

    fn fail(
        &self,
        mut report: RunReport,
        started: Instant,
        task: TaskName,
        source: ActionError,
    ) -> RunFailure {
        report.abort_running();
        report.finish(started.elapsed());
        warn!(
            run_id = report.run_id(),
            task = %task,
            aborted = report.count(TaskRunState::Aborted),
            not_started = report.count(TaskRunState::NotStarted),
            "run failed; stopping"
        );
        RunFailure {
            report,
            task,
            source,
        }
    }

    async fn run_task(&self, run_id: u64, task: &Task) -> (TaskName, std::result::Result<(), ActionError>) {
        let started = Instant::now();
        info!(task = %task.name(), run_id, kind = task.action().kind(), "starting task");

        let result = task.action().run(task.name(), &self.ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => info!(task = %task.name(), run_id, elapsed_ms, "task finished"),
            Err(err) => error!(task = %task.name(), run_id, elapsed_ms, error = %err, "task failed"),
        }

        (task.name().to_string(), result)
    }
}
