// src/exec/backend.rs

//! Pluggable rebuild backend.
//!
//! The watch runtime talks to a `Rebuilder` instead of the scheduler
//! directly. Production uses [`SchedulerRebuilder`]; tests provide a fake
//! that records requests and emits `RebuildFinished` events itself.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dag::{PlanScope, Scheduler};
use crate::engine::{RebuildOutcome, RebuildRequest, RuntimeEvent};
use crate::errors::Result;

/// Starts rebuilds on behalf of the runtime.
///
/// `start_rebuild` must return once the rebuild is *started*; completion is
/// reported later as `RuntimeEvent::RebuildFinished` carrying the request id.
pub trait Rebuilder: Send {
    fn start_rebuild(
        &mut self,
        request: RebuildRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs each rebuild through the [`Scheduler`] on a spawned task.
///
/// Only the bound tasks run (`PlanScope::TargetsOnly`); their prerequisites
/// are assumed built by the initial run.
#[derive(Debug, Clone)]
pub struct SchedulerRebuilder {
    scheduler: Scheduler,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl SchedulerRebuilder {
    pub fn new(scheduler: Scheduler, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            scheduler,
            runtime_tx,
        }
    }
}

impl Rebuilder for SchedulerRebuilder {
    fn start_rebuild(
        &mut self,
        request: RebuildRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let scheduler = self.scheduler.clone();
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let outcome = match scheduler
                    .run_targets(&request.tasks, PlanScope::TargetsOnly)
                    .await
                {
                    Ok(report) => {
                        debug!(rebuild_id = request.id, run_id = report.run_id(), "rebuild run done");
                        RebuildOutcome::Success
                    }
                    Err(err) => RebuildOutcome::Failed {
                        task: err.failed_task().map(str::to_string),
                        message: err.to_string(),
                    },
                };

                if let Err(err) = tx
                    .send(RuntimeEvent::RebuildFinished {
                        rebuild_id: request.id,
                        outcome,
                    })
                    .await
                {
                    warn!(error = %err, "runtime gone before rebuild finished");
                }
            });
            Ok(())
        })
    }
}
