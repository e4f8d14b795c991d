// src/actions/optimize.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::actions::template::{Template, Vars};
use crate::actions::transform::ensure_parent;
use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::cache::{ContentCache, compute_bytes_hash, compute_file_hash};
use crate::errors::ActionError;
use crate::exec::ToolInvocation;
use crate::fs::{FileSet, FileSystem, MatchedFile, RealFileSystem};

/// Per-file tool invocation skipped when the content cache shows `dest`
/// already holds the output for this exact input and command.
#[derive(Debug)]
pub struct OptimizeAction {
    pub src: FileSet,
    pub dest: PathBuf,
    pub cmd: Template,
}

enum FileOutcome {
    Optimized,
    Skipped,
}

impl OptimizeAction {
    async fn optimize_file(
        &self,
        task: &str,
        ctx: &ActionContext,
        file: &MatchedFile,
    ) -> Result<FileOutcome, ActionError> {
        let input = tokio::fs::read(&file.path)
            .await
            .map_err(|e| ActionError::fs(&file.path, e))?;
        let key = ContentCache::cache_key(self.cmd.source(), &input);
        let output = ctx.resolve(&self.dest).join(&file.relative);

        if let Some(expected) = ctx.cache().lookup(&key) {
            if current_hash(&output).await.is_some_and(|h| h == expected) {
                debug!(task, input = ?file.path, "output up to date; skipping");
                return Ok(FileOutcome::Skipped);
            }
        }

        ensure_parent(&output).await?;
        let vars = Vars::new()
            .set_path("input", &file.path)
            .set_path("output", &output);
        let command = self.cmd.render(&vars, ctx.project());
        let invocation = ToolInvocation::new(task, command.clone(), ctx.root())
            .with_input(&file.path)
            .with_output(&output);
        ctx.tools().invoke(&invocation).await?;

        let produced = match tokio::fs::read(&output).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return Err(ActionError::tool(
                    command,
                    format!("produced no output at {}", output.display()),
                ));
            }
        };
        let output_hash = compute_bytes_hash(&produced);
        ctx.cache().record(&key, &output_hash);
        // An already-optimized file fed back in maps onto itself.
        ctx.cache()
            .record(&ContentCache::cache_key(self.cmd.source(), &produced), &output_hash);

        Ok(FileOutcome::Optimized)
    }
}

/// Hash of the file at `path`, or `None` if it is missing or unreadable.
async fn current_hash(path: &Path) -> Option<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        RealFileSystem
            .is_file(&path)
            .then(|| compute_file_hash(&RealFileSystem, &path).ok())
            .flatten()
    })
    .await
    .ok()
    .flatten()
}

impl TaskAction for OptimizeAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let files = ctx.resolve_files(&self.src).await?;
            let mut optimized = 0usize;
            let mut skipped = 0usize;

            for file in &files {
                match self.optimize_file(task, ctx, file).await? {
                    FileOutcome::Optimized => optimized += 1,
                    FileOutcome::Skipped => skipped += 1,
                }
            }

            info!(task, optimized, skipped, "optimize finished");
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "optimize"
    }
}
