// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces [`CoreCommand`]s for the
//! async shell (`engine::runtime::Runtime`), which is responsible for:
//! - reading events from channels
//! - starting rebuilds through a `Rebuilder`
//! - publishing reload notifications
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.
//!
//! [`CoreCommand`]: crate::engine::CoreCommand

use crate::engine::event_handlers::{
    CoreStep, RebuildState, handle_binding_trigger, handle_rebuild_finished,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::rebuild::RebuildRequest;
use crate::engine::{BindingInfo, RuntimeEvent, RuntimeOptions};

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: RebuildState,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(bindings: Vec<BindingInfo>, queue_length: usize, options: RuntimeOptions) -> Self {
        Self {
            state: RebuildState {
                bindings,
                queue: TriggerQueue::new(queue_length),
                active: None,
                next_id: 0,
            },
            options,
        }
    }

    /// True when no rebuild is in flight.
    pub fn is_idle(&self) -> bool {
        self.state.active.is_none()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.state.queue.is_empty()
    }

    pub fn active_rebuild(&self) -> Option<&RebuildRequest> {
        self.state.active.as_ref()
    }

    pub fn bindings(&self) -> &[BindingInfo] {
        &self.state.bindings
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::BindingTriggered { binding, reason } => {
                handle_binding_trigger(&mut self.state, binding, reason)
            }
            RuntimeEvent::RebuildFinished {
                rebuild_id,
                outcome,
            } => handle_rebuild_finished(&mut self.state, &self.options, rebuild_id, outcome),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CoreCommand, RebuildOutcome, TriggerReason};

    fn core() -> CoreRuntime {
        CoreRuntime::new(
            vec![
                BindingInfo {
                    tasks: vec!["styles".into()],
                    reload: true,
                },
                BindingInfo {
                    tasks: vec!["scripts".into()],
                    reload: false,
                },
            ],
            1,
            RuntimeOptions::default(),
        )
    }

    fn trigger(binding: usize) -> RuntimeEvent {
        RuntimeEvent::BindingTriggered {
            binding,
            reason: TriggerReason::FileWatch,
        }
    }

    #[test]
    fn success_emits_exactly_one_reload() {
        let mut core = core();
        let step = core.step(trigger(0));
        assert!(matches!(step.commands.as_slice(), [CoreCommand::StartRebuild(r)] if r.id == 1));
        assert!(!core.is_idle());

        let step = core.step(RuntimeEvent::RebuildFinished {
            rebuild_id: 1,
            outcome: RebuildOutcome::Success,
        });
        let reloads = step
            .commands
            .iter()
            .filter(|c| matches!(c, CoreCommand::Reload(_)))
            .count();
        assert_eq!(reloads, 1);
        assert!(core.is_idle());
    }

    #[test]
    fn failure_emits_no_reload() {
        let mut core = core();
        core.step(trigger(0));
        let step = core.step(RuntimeEvent::RebuildFinished {
            rebuild_id: 1,
            outcome: RebuildOutcome::Failed {
                task: Some("styles".into()),
                message: "boom".into(),
            },
        });
        assert!(step.commands.is_empty());
    }

    #[test]
    fn triggers_during_rebuild_are_queued_not_started() {
        let mut core = core();
        core.step(trigger(0));
        let step = core.step(trigger(1));
        assert!(step.commands.is_empty());
        assert!(!core.queue_is_empty());

        let step = core.step(RuntimeEvent::RebuildFinished {
            rebuild_id: 1,
            outcome: RebuildOutcome::Success,
        });
        assert!(matches!(
            step.commands.last(),
            Some(CoreCommand::StartRebuild(r)) if r.id == 2 && r.tasks == vec!["scripts".to_string()]
        ));
        assert!(core.queue_is_empty());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut core = core();
        core.step(trigger(0));
        let step = core.step(RuntimeEvent::RebuildFinished {
            rebuild_id: 42,
            outcome: RebuildOutcome::Success,
        });
        assert!(step.commands.is_empty());
        assert!(!core.is_idle());
    }
}
