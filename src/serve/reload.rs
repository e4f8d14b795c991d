// src/serve/reload.rs

use tokio::sync::broadcast;
use tracing::debug;

use crate::engine::TaskName;

/// Sent once per successful rebuild of a `reload = true` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadNotice {
    pub rebuild_id: u64,
    pub tasks: Vec<TaskName>,
}

/// Broadcasts reload notices to every connected browser (and tests).
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadNotice>,
}

impl ReloadHub {
    /// `capacity` bounds how many notices a slow subscriber may lag behind.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadNotice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Returns the number of subscribers that received it;
    /// zero subscribers is not an error.
    pub fn notify(&self, notice: ReloadNotice) -> usize {
        match self.tx.send(notice) {
            Ok(n) => n,
            Err(_) => {
                debug!("no reload subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(16)
    }
}
