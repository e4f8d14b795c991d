// src/actions/transform.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::actions::template::{Template, Vars};
use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::errors::ActionError;
use crate::exec::ToolInvocation;
use crate::fs::FileSet;

/// Runs `cmd` once per source file, writing to `dest/<relative path>`.
///
/// Covers style compilation, template minification and unused-style
/// stripping; the tool is whatever `cmd` names.
#[derive(Debug)]
pub struct TransformAction {
    pub src: FileSet,
    pub dest: PathBuf,
    pub cmd: Template,
    /// Replaces the output file's extension (`scss` -> `css`).
    pub extension: Option<String>,
    /// Reference URLs, available as `{urls}`.
    pub urls: Vec<String>,
}

impl TransformAction {
    /// Where the output for a file with this relative path goes.
    pub fn output_path(&self, root: &Path, relative: &Path) -> PathBuf {
        let mut out = root.join(&self.dest).join(relative);
        if let Some(ext) = &self.extension {
            out.set_extension(ext);
        }
        out
    }
}

impl TaskAction for TransformAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let files = ctx.resolve_files(&self.src).await?;
            if files.is_empty() {
                warn!(task, patterns = ?self.src.patterns(), "no input files matched");
                return Ok(());
            }

            for file in &files {
                let output = self.output_path(ctx.root(), &file.relative);
                ensure_parent(&output).await?;

                let vars = Vars::new()
                    .set_path("input", &file.path)
                    .set_path("output", &output)
                    .set_list("urls", &self.urls);
                let command = self.cmd.render(&vars, ctx.project());
                debug!(task, input = ?file.path, output = ?output, "transforming");

                let invocation = ToolInvocation::new(task, command, ctx.root())
                    .with_input(&file.path)
                    .with_output(&output);
                ctx.tools().invoke(&invocation).await?;
            }

            info!(task, files = files.len(), "transformed");
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "transform"
    }
}

/// Create the parent directory of `path` if needed.
pub(crate) async fn ensure_parent(path: &Path) -> Result<(), ActionError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ActionError::fs(parent, e))?;
    }
    Ok(())
}
