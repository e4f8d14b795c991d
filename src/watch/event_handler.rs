// src/watch/event_handler.rs

//! Turning filesystem changes into binding triggers.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::ModifyKind;
use tracing::{debug, trace};

use crate::engine::BindingId;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchBinding;

/// Content changes only; access and metadata-only events are ignored.
pub fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Bindings matched by any of `paths`, each at most once.
pub fn bindings_for_paths(
    root: &Path,
    paths: &[PathBuf],
    bindings: &[WatchBinding],
) -> BTreeSet<BindingId> {
    let mut matched = BTreeSet::new();

    for path in paths {
        let Some(rel) = relative_str(root, path) else {
            trace!(?path, "event outside watch root");
            continue;
        };
        for binding in bindings {
            if binding.matches(&rel) && matched.insert(binding.id()) {
                debug!(binding = binding.id(), path = %rel, tasks = ?binding.tasks(), "watch match");
            }
        }
    }

    matched
}
