// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::Rebuilder;
use crate::serve::ReloadHub;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the core in response to `RuntimeEvent`s, delegating rebuilds to a
/// [`Rebuilder`] and reload notifications to a [`ReloadHub`].
///
/// All semantics live in [`CoreRuntime`]; this struct only does IO.
pub struct Runtime<R: Rebuilder> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    rebuilder: R,
    reload: ReloadHub,
}

impl<R: Rebuilder> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<R: Rebuilder> Runtime<R> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        rebuilder: R,
        reload: ReloadHub,
    ) -> Self {
        Self {
            core,
            event_rx,
            rebuilder,
            reload,
        }
    }

    /// Main event loop. Returns on shutdown, when the core asks to exit, or
    /// when every event sender is gone.
    pub async fn run(mut self) -> Result<()> {
        info!(bindings = self.core.bindings().len(), "watch runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartRebuild(request) => {
                self.rebuilder.start_rebuild(request).await?;
            }
            CoreCommand::Reload(notice) => {
                let receivers = self.reload.notify(notice.clone());
                info!(rebuild_id = notice.rebuild_id, receivers, "reload notification sent");
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}
