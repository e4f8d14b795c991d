// src/engine/mod.rs

//! Watch-mode orchestration engine.
//!
//! This module ties together:
//! - the trigger queue (what happens when bindings fire while a rebuild is
//!   in flight)
//! - the rebuild slot (at most one rebuild at a time)
//! - the main runtime event loop that reacts to:
//!   - binding triggers from the file watcher
//!   - rebuild completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::config::model::BindingConfig;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Index of a watch binding in declaration order.
pub type BindingId = usize;

/// Why a binding was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Triggered programmatically (tests, tooling).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no rebuild is running and nothing is
    /// queued.
    pub exit_when_idle: bool,
}

/// What the core needs to know about a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub tasks: Vec<TaskName>,
    pub reload: bool,
}

impl From<&BindingConfig> for BindingInfo {
    fn from(cfg: &BindingConfig) -> Self {
        Self {
            tasks: cfg.tasks.clone(),
            reload: cfg.reload,
        }
    }
}

/// Events flowing into the runtime from the watcher and the rebuilder.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Files matching a binding changed.
    BindingTriggered {
        binding: BindingId,
        reason: TriggerReason,
    },
    /// A rebuild started by the core has finished.
    RebuildFinished {
        rebuild_id: u64,
        outcome: RebuildOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod rebuild;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use rebuild::{RebuildOutcome, RebuildRequest};
pub use runtime::Runtime;
