// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::rebuild::{RebuildOutcome, RebuildRequest};
use crate::engine::{BindingId, BindingInfo, RuntimeOptions, TriggerReason};
use crate::serve::ReloadNotice;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start this rebuild.
    StartRebuild(RebuildRequest),
    /// Tell connected browsers to reload.
    Reload(ReloadNotice),
    /// Request that the process exits (when idle and `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Binding table, queue and the single rebuild slot.
#[derive(Debug)]
pub(crate) struct RebuildState {
    pub bindings: Vec<BindingInfo>,
    pub queue: TriggerQueue,
    /// The in-flight rebuild, if any. At most one at a time.
    pub active: Option<RebuildRequest>,
    pub next_id: u64,
}

impl RebuildState {
    fn start(&mut self, bindings: &[BindingId]) -> RebuildRequest {
        self.next_id += 1;
        let request = RebuildRequest::for_bindings(self.next_id, bindings, &self.bindings);
        info!(
            rebuild_id = request.id,
            bindings = ?request.bindings,
            tasks = ?request.tasks,
            "starting rebuild"
        );
        self.active = Some(request.clone());
        request
    }
}

/// Handle a binding trigger.
///
/// - Idle: start a rebuild for this binding immediately.
/// - Busy: queue it. The in-flight rebuild is never interrupted.
pub(crate) fn handle_binding_trigger(
    state: &mut RebuildState,
    binding: BindingId,
    reason: TriggerReason,
) -> CoreStep {
    if binding >= state.bindings.len() {
        warn!(binding, "trigger for unknown binding; ignoring");
        return CoreStep::continue_with(Vec::new());
    }

    if let Some(active) = &state.active {
        debug!(binding, ?reason, rebuild_id = active.id, "rebuild in flight; queueing trigger");
        state.queue.record_trigger(binding);
        return CoreStep::continue_with(Vec::new());
    }

    let request = state.start(&[binding]);
    CoreStep::continue_with(vec![CoreCommand::StartRebuild(request)])
}

/// Handle the end of a rebuild: reload on success, then start whatever
/// was queued meanwhile.
pub(crate) fn handle_rebuild_finished(
    state: &mut RebuildState,
    options: &RuntimeOptions,
    rebuild_id: u64,
    outcome: RebuildOutcome,
) -> CoreStep {
    let Some(finished) = state.active.take_if(|active| active.id == rebuild_id) else {
        warn!(rebuild_id, "completion for a rebuild that is not active; ignoring");
        return CoreStep::continue_with(Vec::new());
    };

    let mut commands = Vec::new();
    match &outcome {
        RebuildOutcome::Success => {
            info!(rebuild_id, tasks = ?finished.tasks, "rebuild succeeded");
            if finished.reload {
                commands.push(CoreCommand::Reload(ReloadNotice {
                    rebuild_id,
                    tasks: finished.tasks.clone(),
                }));
            }
        }
        RebuildOutcome::Failed { task, message } => {
            warn!(
                rebuild_id,
                task = task.as_deref().unwrap_or("-"),
                error = %message,
                "rebuild failed; no reload"
            );
        }
    }

    if let Some(request) = maybe_start_queued(state) {
        commands.push(CoreCommand::StartRebuild(request));
    } else if options.exit_when_idle {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::continue_with(commands)
}

/// If no rebuild is active and a batch is queued, start it.
pub(crate) fn maybe_start_queued(state: &mut RebuildState) -> Option<RebuildRequest> {
    if state.active.is_some() {
        return None;
    }
    let batch = state.queue.pop_next()?;
    Some(state.start(&batch))
}
