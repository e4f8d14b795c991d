// src/actions/screenshot.rs

use std::path::{Path, PathBuf};

use tracing::info;

use crate::actions::template::{Template, Vars};
use crate::actions::transform::ensure_parent;
use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::exec::ToolInvocation;
use crate::types::Viewport;

/// Captures one screenshot per viewport.
#[derive(Debug)]
pub struct ScreenshotAction {
    pub cmd: Template,
    pub dest: PathBuf,
    /// Page to capture; the project's local URL when unset.
    pub url: Option<String>,
    pub viewports: Vec<Viewport>,
}

impl ScreenshotAction {
    /// `dest/<project name>-<W>x<H>.png`
    pub fn output_path(&self, root: &Path, project_name: &str, viewport: Viewport) -> PathBuf {
        root.join(&self.dest)
            .join(format!("{project_name}-{viewport}.png"))
    }
}

impl TaskAction for ScreenshotAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let url = self
                .url
                .clone()
                .unwrap_or_else(|| ctx.project().local_url());

            for viewport in &self.viewports {
                let output = self.output_path(ctx.root(), &ctx.project().name, *viewport);
                ensure_parent(&output).await?;

                let vars = Vars::new()
                    .set("url", url.as_str())
                    .set("width", viewport.width.to_string())
                    .set("height", viewport.height.to_string())
                    .set_path("output", &output);
                let command = self.cmd.render(&vars, ctx.project());
                let invocation = ToolInvocation::new(task, command, ctx.root()).with_output(&output);
                ctx.tools().invoke(&invocation).await?;
            }

            info!(task, url = %url, viewports = self.viewports.len(), "screenshots captured");
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "screenshot"
    }
}
