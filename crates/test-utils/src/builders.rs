#![allow(dead_code)]

use std::collections::BTreeMap;

use assetdag::config::{
    ActionKind, BindingConfig, ConfigFile, ConfigSection, ProjectSection, RawConfigFile,
    ServeSection, TaskConfig, WatchSection,
};
use assetdag::errors::Result;
use assetdag::types::AuditStrategy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection {
                    name: "mysite".to_string(),
                    domain: "www.mysite.com".to_string(),
                    ..ProjectSection::default()
                },
                config: ConfigSection::default(),
                watch: WatchSection::default(),
                serve: ServeSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_default_target(mut self, name: &str) -> Self {
        self.config.config.default_target = name.to_string();
        self
    }

    pub fn with_work_dir(mut self, dir: &str) -> Self {
        self.config.config.work_dir = Some(dir.to_string());
        self
    }

    pub fn with_project(mut self, name: &str, domain: &str) -> Self {
        self.config.project.name = name.to_string();
        self.config.project.domain = domain.to_string();
        self
    }

    pub fn with_binding(mut self, patterns: &[&str], tasks: &[&str], reload: bool) -> Self {
        self.config.watch.binding.push(BindingConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            exclude: Vec::new(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            reload,
        });
        self
    }

    pub fn with_queue_length(mut self, n: usize) -> Self {
        self.config.watch.queue_length = n;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build().expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                ..TaskConfig::default()
            },
        }
    }

    pub fn group() -> Self {
        Self::new(ActionKind::Group)
    }

    pub fn command(cmd: &str) -> Self {
        Self::new(ActionKind::Command).cmd(cmd)
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.task.cmd = Some(cmd.to_string());
        self
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dest: &str) -> Self {
        self.task.dest = Some(dest.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.task.paths.push(path.to_string());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.task.extension = Some(ext.to_string());
        self
    }

    pub fn post_cmd(mut self, cmd: &str) -> Self {
        self.task.post_cmd = Some(cmd.to_string());
        self
    }

    pub fn separator(mut self, sep: &str) -> Self {
        self.task.separator = Some(sep.to_string());
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.task.url = Some(url.to_string());
        self
    }

    pub fn reference_url(mut self, url: &str) -> Self {
        self.task.urls.push(url.to_string());
        self
    }

    pub fn viewport(mut self, viewport: &str) -> Self {
        self.task.viewports.push(viewport.to_string());
        self
    }

    pub fn strategy(mut self, strategy: AuditStrategy) -> Self {
        self.task.strategy = Some(strategy);
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.task.threshold = Some(threshold);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
