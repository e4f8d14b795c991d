// src/actions/bundle.rs

use std::path::PathBuf;

use tracing::{info, warn};

use crate::actions::template::{Template, Vars};
use crate::actions::transform::ensure_parent;
use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::errors::ActionError;
use crate::exec::ToolInvocation;
use crate::fs::FileSet;

/// Concatenates the ordered file set into one file, then optionally runs
/// `post_cmd` on it (e.g. a minifier).
#[derive(Debug)]
pub struct BundleAction {
    pub src: FileSet,
    pub dest: PathBuf,
    pub separator: String,
    pub post_cmd: Option<Template>,
}

impl TaskAction for BundleAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let files = ctx.resolve_files(&self.src).await?;
            if files.is_empty() {
                warn!(task, patterns = ?self.src.patterns(), "no input files matched; writing empty bundle");
            }

            let mut bundle: Vec<u8> = Vec::new();
            for (i, file) in files.iter().enumerate() {
                if i > 0 {
                    bundle.extend_from_slice(self.separator.as_bytes());
                }
                let bytes = tokio::fs::read(&file.path)
                    .await
                    .map_err(|e| ActionError::fs(&file.path, e))?;
                bundle.extend_from_slice(&bytes);
            }

            let output = ctx.resolve(&self.dest);
            ensure_parent(&output).await?;
            tokio::fs::write(&output, &bundle)
                .await
                .map_err(|e| ActionError::fs(&output, e))?;

            info!(task, files = files.len(), bytes = bundle.len(), output = ?output, "bundled");

            if let Some(post) = &self.post_cmd {
                let vars = Vars::new().set_path("output", &output);
                let command = post.render(&vars, ctx.project());
                let invocation = ToolInvocation::new(task, command, ctx.root()).with_output(&output);
                ctx.tools().invoke(&invocation).await?;
            }
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "bundle"
    }
}
