// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::event_handler::{bindings_for_paths, is_relevant};
use crate::watch::patterns::WatchBinding;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send one `BindingTriggered` per matched
/// binding for every debounced burst of changes.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Blocking notify callback -> async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_relevant(&event.kind) && event_tx.send(event.paths).is_err() {
                    eprintln!("assetdag: watcher channel closed; dropping event");
                }
            }
            Err(err) => eprintln!("assetdag: file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = ?root, bindings = bindings.len(), debounce_ms = debounce.as_millis() as u64, "file watcher started");

    let bindings = Arc::new(bindings);
    tokio::spawn(async move {
        while let Some(paths) = collect_debounced(&mut event_rx, debounce).await {
            debug!(changed = paths.len(), "debounced filesystem changes");
            for binding in bindings_for_paths(&root, &paths, &bindings) {
                let event = RuntimeEvent::BindingTriggered {
                    binding,
                    reason: TriggerReason::FileWatch,
                };
                if let Err(err) = runtime_tx.send(event).await {
                    warn!("failed to send BindingTriggered: {err}");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Wait for the next change, then keep absorbing changes until `window`
/// passes without one. Returns the distinct paths, or `None` once the
/// channel is closed and drained.
pub async fn collect_debounced(
    rx: &mut mpsc::UnboundedReceiver<Vec<PathBuf>>,
    window: Duration,
) -> Option<Vec<PathBuf>> {
    let mut paths: BTreeSet<PathBuf> = rx.recv().await?.into_iter().collect();

    loop {
        match tokio::time::timeout(window, rx.recv()).await {
            Ok(Some(more)) => paths.extend(more),
            Ok(None) | Err(_) => break,
        }
    }

    Some(paths.into_iter().collect())
}
