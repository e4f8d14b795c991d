// src/actions/clean.rs

use std::io::ErrorKind;

use tracing::{debug, info};

use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::errors::ActionError;

/// Removes directories and files. Paths that do not exist are skipped.
#[derive(Debug, Clone)]
pub struct CleanAction {
    paths: Vec<String>,
}

impl CleanAction {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

impl TaskAction for CleanAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let mut removed = 0usize;
            for rel in &self.paths {
                let path = ctx.resolve(rel);
                let meta = match tokio::fs::symlink_metadata(&path).await {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!(task, path = ?path, "nothing to clean");
                        continue;
                    }
                    Err(e) => return Err(ActionError::fs(&path, e)),
                };

                let result = if meta.is_dir() {
                    tokio::fs::remove_dir_all(&path).await
                } else {
                    tokio::fs::remove_file(&path).await
                };
                match result {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(ActionError::fs(&path, e)),
                }
            }
            info!(task, removed, "cleaned");
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "clean"
    }
}
