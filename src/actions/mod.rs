// src/actions/mod.rs

//! Task actions: what a task does when the scheduler runs it.
//!
//! Every action goes through [`ActionContext`] for its collaborators (tool
//! runner, remote auditor, content cache), so tests can swap any of them for
//! fakes. File contents live on the real disk the tools write to.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ContentCache;
use crate::config::model::{ActionKind, ConfigFile, ProjectSection, TaskConfig};
use crate::dag::TaskRegistry;
use crate::errors::{ActionError, AssetdagError, Result};
use crate::exec::{ShellToolRunner, ToolRunner};
use crate::fs::{FileSet, FileSystem, MatchedFile, RealFileSystem};
use crate::types::Viewport;

pub mod audit;
pub mod bundle;
pub mod clean;
pub mod command;
pub mod optimize;
pub mod screenshot;
pub mod template;
pub mod transform;

pub use audit::{AuditAction, AuditReport, PageSpeedAuditor, RemoteAuditor};
pub use bundle::BundleAction;
pub use clean::CleanAction;
pub use command::CommandAction;
pub use optimize::OptimizeAction;
pub use screenshot::ScreenshotAction;
pub use template::Template;
pub use transform::TransformAction;

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = std::result::Result<(), ActionError>> + Send + 'a>>;

/// An executable build step.
pub trait TaskAction: Send + Sync + fmt::Debug {
    /// Run the step for `task`.
    fn run<'a>(&'a self, task: &'a str, ctx: &'a ActionContext) -> ActionFuture<'a>;

    /// Short label used in logs and `--list`.
    fn kind(&self) -> &'static str;
}

/// Shared collaborators and project information for actions.
pub struct ActionContext {
    root: PathBuf,
    project: ProjectSection,
    tools: Arc<dyn ToolRunner>,
    auditor: Arc<dyn RemoteAuditor>,
    cache: Arc<ContentCache>,
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("root", &self.root)
            .field("project", &self.project.name)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ActionContext {
    /// Production collaborators with an in-memory content cache.
    pub fn new(root: impl Into<PathBuf>, project: ProjectSection) -> Self {
        Self {
            root: root.into(),
            project,
            tools: Arc::new(ShellToolRunner::new()),
            auditor: Arc::new(PageSpeedAuditor::from_env()),
            cache: Arc::new(ContentCache::in_memory()),
        }
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolRunner>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_auditor(mut self, auditor: Arc<dyn RemoteAuditor>) -> Self {
        self.auditor = auditor;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ContentCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Project root; every configured path is relative to it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &ProjectSection {
        &self.project
    }

    pub fn tools(&self) -> &dyn ToolRunner {
        self.tools.as_ref()
    }

    pub fn auditor(&self) -> &dyn RemoteAuditor {
        self.auditor.as_ref()
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Resolve a file set against the root on the blocking pool, so a large
    /// directory walk does not stall sibling tasks in the batch.
    pub(crate) async fn resolve_files(
        &self,
        set: &FileSet,
    ) -> std::result::Result<Vec<MatchedFile>, ActionError> {
        let set = set.clone();
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || set.resolve(&RealFileSystem, &root))
            .await
            .map_err(|e| ActionError::fs(&self.root, format!("file discovery aborted: {e}")))?
            .map_err(|e| ActionError::fs(&self.root, format!("{e:#}")))
    }
}

/// Aggregates prerequisites and does nothing itself.
#[derive(Debug, Clone, Default)]
pub struct GroupAction;

impl TaskAction for GroupAction {
    fn run<'a>(&'a self, task: &'a str, _ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            debug!(task, "group reached");
            Ok(())
        })
    }

    fn kind(&self) -> &'static str {
        "group"
    }
}

/// Build the action for one validated task definition.
pub fn build_action(name: &str, cfg: &TaskConfig) -> Result<Arc<dyn TaskAction>> {
    let missing = |field: &str| {
        AssetdagError::ConfigError(format!("task '{name}' is missing `{field}`"))
    };
    let files = |patterns: &[String]| -> Result<FileSet> {
        FileSet::new(patterns).map_err(|e| {
            AssetdagError::ConfigError(format!("task '{name}' has an invalid `src`: {e:#}"))
        })
    };

    let action: Arc<dyn TaskAction> = match cfg.kind {
        ActionKind::Group => Arc::new(GroupAction),
        ActionKind::Command => Arc::new(CommandAction::new(Template::new(
            cfg.cmd.clone().ok_or_else(|| missing("cmd"))?,
        ))),
        ActionKind::Clean => Arc::new(CleanAction::new(cfg.paths.clone())),
        ActionKind::Transform => Arc::new(TransformAction {
            src: files(&cfg.src)?,
            dest: PathBuf::from(cfg.dest.clone().ok_or_else(|| missing("dest"))?),
            cmd: Template::new(cfg.cmd.clone().ok_or_else(|| missing("cmd"))?),
            extension: cfg.extension.clone(),
            urls: cfg.urls.clone(),
        }),
        ActionKind::Bundle => Arc::new(BundleAction {
            src: files(&cfg.src)?,
            dest: PathBuf::from(cfg.dest.clone().ok_or_else(|| missing("dest"))?),
            separator: cfg.separator.clone().unwrap_or_else(|| "\n".to_string()),
            post_cmd: cfg.post_cmd.clone().map(Template::new),
        }),
        ActionKind::Optimize => Arc::new(OptimizeAction {
            src: files(&cfg.src)?,
            dest: PathBuf::from(cfg.dest.clone().ok_or_else(|| missing("dest"))?),
            cmd: Template::new(cfg.cmd.clone().ok_or_else(|| missing("cmd"))?),
        }),
        ActionKind::Audit => Arc::new(AuditAction {
            strategy: cfg.strategy.unwrap_or_default(),
            threshold: cfg.threshold,
            url: cfg.url.clone(),
        }),
        ActionKind::Screenshot => {
            let viewports = cfg
                .viewports
                .iter()
                .map(|v| {
                    v.parse::<Viewport>().map_err(|e| {
                        AssetdagError::ConfigError(format!("task '{name}': {e}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(ScreenshotAction {
                cmd: Template::new(cfg.cmd.clone().ok_or_else(|| missing("cmd"))?),
                dest: PathBuf::from(cfg.dest.clone().ok_or_else(|| missing("dest"))?),
                url: cfg.url.clone(),
                viewports,
            })
        }
    };
    Ok(action)
}

/// Register every configured task.
pub fn build_registry(cfg: &ConfigFile) -> Result<TaskRegistry> {
    let mut builder = TaskRegistry::builder();
    for (name, task_cfg) in cfg.tasks() {
        let action = build_action(name, task_cfg)?;
        builder.register_task(
            crate::dag::Task::new(name.clone(), task_cfg.after.clone(), action)
                .with_description(task_cfg.description.clone()),
        )?;
    }
    builder.build()
}

/// Production context for a loaded config rooted at `root`.
pub fn build_context(cfg: &ConfigFile, root: &Path) -> Result<ActionContext> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let cache = ContentCache::for_mode(cfg.config.cache_storage, root, fs.clone())?;
    Ok(ActionContext::new(root, cfg.project.clone()).with_cache(Arc::new(cache)))
}
