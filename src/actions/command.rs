// src/actions/command.rs

use crate::actions::template::{Template, Vars};
use crate::actions::{ActionContext, ActionFuture, TaskAction};
use crate::exec::ToolInvocation;

/// Runs a shell command from the project root.
#[derive(Debug, Clone)]
pub struct CommandAction {
    cmd: Template,
}

impl CommandAction {
    pub fn new(cmd: Template) -> Self {
        Self { cmd }
    }
}

impl TaskAction for CommandAction {
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let command = self.cmd.render(&Vars::new(), ctx.project());
            let invocation = ToolInvocation::new(task, command, ctx.root());
            ctx.tools().invoke(&invocation).await
        })
    }

    fn kind(&self) -> &'static str {
        "command"
    }
}
