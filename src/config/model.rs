// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{AuditStrategy, CacheStorageMode};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [project]
/// name = "mysite"
/// domain = "www.mysite.com"
///
/// [config]
/// default_target = "default"
/// work_dir = ".tmp"
///
/// [watch]
/// debounce_ms = 200
///
/// [[watch.binding]]
/// patterns = ["src/scss/**/*.scss"]
/// tasks = ["styles"]
/// reload = true
///
/// [task.styles]
/// kind = "transform"
/// src = ["src/scss/*.scss"]
/// dest = "public/css"
/// cmd = "sass {input} {output}"
/// extension = "css"
///
/// [task.default]
/// after = ["styles"]
/// ```
///
/// All sections except `[task.*]` are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub serve: ServeSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration.
///
/// Produced by `TryFrom<RawConfigFile>` (see `validate.rs`), which checks
/// that the task graph is acyclic, every `after` reference and binding
/// target exists, and every task has the fields its kind needs. The fields
/// are public for reading; a value assembled by hand skips those checks.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub config: ConfigSection,
    pub watch: WatchSection,
    pub serve: ServeSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            config: raw.config,
            watch: raw.watch,
            serve: raw.serve,
            task: raw.task,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn bindings(&self) -> &[BindingConfig] {
        &self.watch.binding
    }
}

/// `[project]` section: an opaque descriptor handed to collaborators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: String,

    /// Public domain, passed to remote auditors.
    #[serde(default)]
    pub domain: String,

    /// Overrides the derived local development URL (`http://<name>.test`).
    #[serde(default)]
    pub local_url: Option<String>,

    /// Any other keys, available to command templates as `{project.<key>}`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl ProjectSection {
    /// URL of the local development site.
    pub fn local_url(&self) -> String {
        match &self.local_url {
            Some(url) => url.clone(),
            None => format!("http://{}.test", self.name),
        }
    }

    /// Look up an extra key as a string.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "name" => Some(self.name.clone()),
            "domain" => Some(self.domain.clone()),
            "local_url" => Some(self.local_url()),
            other => self.extra.get(other).map(|v| match v {
                toml::Value::String(s) => s.clone(),
                v => v.to_string(),
            }),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Target used when the CLI is invoked without one.
    #[serde(default = "default_target")]
    pub default_target: String,

    /// Transient working directory, cleared at the start of each one-shot run.
    #[serde(default)]
    pub work_dir: Option<String>,

    /// Final public output directory (also the dev server's default root).
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Where the optimizer content cache lives.
    #[serde(default)]
    pub cache_storage: CacheStorageMode,
}

fn default_target() -> String {
    "default".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_target: default_target(),
            work_dir: None,
            public_dir: default_public_dir(),
            cache_storage: CacheStorageMode::default(),
        }
    }
}

/// `[watch]` section plus its `[[watch.binding]]` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period after the last filesystem event before triggering.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of rebuilds remembered while one is in flight.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    #[serde(default)]
    pub binding: Vec<BindingConfig>,
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            queue_length: default_queue_length(),
            binding: Vec::new(),
        }
    }
}

/// One `[[watch.binding]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingConfig {
    /// Glob patterns relative to the project root.
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Tasks re-run when a matching file changes.
    pub tasks: Vec<String>,

    /// Emit a live-reload notification after a successful rebuild.
    #[serde(default)]
    pub reload: bool,
}

/// `[serve]` section for the development server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory to serve; defaults to `[config].public_dir`.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_port() -> u16 {
    3000
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            dir: None,
        }
    }
}

/// What a task does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// No-op; only aggregates prerequisites.
    #[default]
    Group,
    /// Run `cmd` in a shell.
    Command,
    /// Remove `paths`.
    Clean,
    /// Per-file tool invocation from `src` into `dest`.
    Transform,
    /// Ordered concatenation of `src` into the single file `dest`.
    Bundle,
    /// Per-file tool invocation guarded by a content cache.
    Optimize,
    /// Remote page-speed audit of the project domain.
    Audit,
    /// One screenshot per viewport.
    Screenshot,
}

/// `[task.<name>]` section.
///
/// Fields are flat; which ones are required depends on `kind` and is checked
/// in `validate.rs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub kind: ActionKind,

    /// Free-form text shown by `--list`.
    #[serde(default)]
    pub description: Option<String>,

    /// Command template.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Ordered input patterns (`!pattern` excludes).
    #[serde(default)]
    pub src: Vec<String>,

    /// Output directory (`transform`, `optimize`, `screenshot`) or file (`bundle`).
    #[serde(default)]
    pub dest: Option<String>,

    /// Paths removed by `clean`.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Replacement extension for `transform` outputs (e.g. `"css"`).
    #[serde(default)]
    pub extension: Option<String>,

    /// Command run on the bundle after concatenation.
    #[serde(default)]
    pub post_cmd: Option<String>,

    /// Text placed between bundled files (default: newline).
    #[serde(default)]
    pub separator: Option<String>,

    /// Reference URLs available as `{urls}`.
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub strategy: Option<AuditStrategy>,

    /// Minimum acceptable audit score (0-100).
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Page to capture; defaults to the project's local URL.
    #[serde(default)]
    pub url: Option<String>,

    /// `WIDTHxHEIGHT` strings for `screenshot`.
    #[serde(default)]
    pub viewports: Vec<String>,
}
