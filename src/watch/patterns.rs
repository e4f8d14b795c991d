// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobSet, GlobSetBuilder};

use crate::config::model::BindingConfig;
use crate::engine::{BindingId, TaskName};
use crate::fs::fileset::compile_glob;

/// Compiled `[[watch.binding]]`.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"src/scss/main.scss"`) into [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    id: BindingId,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    tasks: Vec<TaskName>,
    reload: bool,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("id", &self.id)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(id: BindingId, cfg: &BindingConfig) -> Result<Self> {
        let watch_set = build_globset(&cfg.patterns)
            .with_context(|| format!("building watch globset for binding #{id}"))?;
        let exclude_set = if cfg.exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&cfg.exclude)
                    .with_context(|| format!("building exclude globset for binding #{id}"))?,
            )
        };

        Ok(Self {
            id,
            watch_set,
            exclude_set,
            tasks: cfg.tasks.clone(),
            reload: cfg.reload,
        })
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn reload(&self) -> bool {
        self.reload
    }

    /// True if `rel_path` matches a pattern and no exclude.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Compile every binding, ids in declaration order.
pub fn build_watch_bindings(bindings: &[BindingConfig]) -> Result<Vec<WatchBinding>> {
    bindings
        .iter()
        .enumerate()
        .map(|(id, cfg)| WatchBinding::new(id, cfg))
        .collect()
}
