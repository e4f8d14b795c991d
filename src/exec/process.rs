// src/exec/process.rs

//! External tool invocation.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::ActionError;

/// Number of trailing stderr lines kept for the error message.
const STDERR_TAIL: usize = 20;

/// One fully-rendered command line, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Task on whose behalf the tool runs.
    pub task: String,
    pub command: String,
    pub cwd: PathBuf,
    /// Input file, when the command processes a single file.
    pub input: Option<PathBuf>,
    /// Output file the command is expected to write.
    pub output: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(task: impl Into<String>, command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            task: task.into(),
            command: command.into(),
            cwd: cwd.into(),
            input: None,
            output: None,
        }
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'a>>;

/// Runs external tools for actions.
///
/// Production uses [`ShellToolRunner`]; tests substitute a fake that records
/// invocations and writes outputs directly.
pub trait ToolRunner: Send + Sync + std::fmt::Debug {
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> ToolFuture<'a>;
}

/// Runs commands through the platform shell.
#[derive(Debug, Clone, Default)]
pub struct ShellToolRunner;

impl ShellToolRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ShellToolRunner {
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> ToolFuture<'a> {
        Box::pin(run_shell(invocation))
    }
}

async fn run_shell(invocation: &ToolInvocation) -> Result<(), ActionError> {
    let started = Instant::now();
    debug!(task = %invocation.task, cmd = %invocation.command, "starting tool process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&invocation.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&invocation.command);
        c
    };

    cmd.current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ActionError::tool(&invocation.command, format!("failed to spawn: {e}")))?;

    let stdout_task = child.stdout.take().map(|stdout| {
        let task = invocation.task.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stdout: {}", line);
            }
        })
    });

    // Consume stderr on this task so the tail is available for the error.
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
    if let Some(stderr) = child.stderr.take() {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %invocation.task, "stderr: {}", line);
            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| ActionError::tool(&invocation.command, format!("failed to wait: {e}")))?;

    if let Some(handle) = stdout_task {
        let _ = handle.await;
    }

    let code = status.code().unwrap_or(-1);
    info!(
        task = %invocation.task,
        exit_code = code,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "tool process exited"
    );

    if status.success() {
        return Ok(());
    }

    let mut message = format!("exit code {code}");
    let stderr_text = Vec::from(tail).join("\n");
    if !stderr_text.trim().is_empty() {
        message.push_str(": ");
        message.push_str(stderr_text.trim());
    }
    Err(ActionError::tool(&invocation.command, message))
}
