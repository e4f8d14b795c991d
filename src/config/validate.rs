// src/config/validate.rs

use std::path::{Component, Path};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ActionKind, ConfigFile, RawConfigFile, TaskConfig};
use crate::dag::{DagGraph, ExecutionPlan, PlanScope};
use crate::errors::{AssetdagError, Result};
use crate::fs::fileset::compile_glob;
use crate::types::Viewport;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    for (name, task) in &cfg.task {
        validate_task_fields(cfg, name, task)?;
    }
    validate_dag(cfg)?;
    validate_bindings(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_err(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(config_err("[watch].queue_length must be >= 1 (got 0)"));
    }

    if !cfg.task.contains_key(&cfg.config.default_target) {
        return Err(config_err(format!(
            "[config].default_target '{}' is not a defined task",
            cfg.config.default_target
        )));
    }

    if let Some(work_dir) = &cfg.config.work_dir {
        ensure_inside_root("[config].work_dir", work_dir)?;
    }

    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(config_err(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(config_err(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Check that the fields `kind` needs are present and well-formed.
fn validate_task_fields(cfg: &RawConfigFile, name: &str, task: &TaskConfig) -> Result<()> {
    let require = |present: bool, field: &str| -> Result<()> {
        if present {
            Ok(())
        } else {
            Err(config_err(format!(
                "task '{}' (kind = {:?}) requires `{}`",
                name, task.kind, field
            )))
        }
    };

    match task.kind {
        ActionKind::Group => {}
        ActionKind::Command => require(task.cmd.is_some(), "cmd")?,
        ActionKind::Clean => {
            require(!task.paths.is_empty(), "paths")?;
            for path in &task.paths {
                ensure_inside_root(&format!("task '{name}' clean path"), path)?;
            }
        }
        ActionKind::Transform | ActionKind::Optimize => {
            require(!task.src.is_empty(), "src")?;
            require(task.dest.is_some(), "dest")?;
            require(task.cmd.is_some(), "cmd")?;
        }
        ActionKind::Bundle => {
            require(!task.src.is_empty(), "src")?;
            require(task.dest.is_some(), "dest")?;
        }
        ActionKind::Audit => {
            if task.url.is_none() && cfg.project.domain.is_empty() {
                return Err(config_err(format!(
                    "task '{}' audits [project].domain, which is not set (or give `url`)",
                    name
                )));
            }
            if let Some(threshold) = task.threshold {
                if !(0.0..=100.0).contains(&threshold) {
                    return Err(config_err(format!(
                        "task '{}' threshold must be within 0..=100 (got {})",
                        name, threshold
                    )));
                }
            }
        }
        ActionKind::Screenshot => {
            require(task.cmd.is_some(), "cmd")?;
            require(task.dest.is_some(), "dest")?;
            require(!task.viewports.is_empty(), "viewports")?;
            for viewport in &task.viewports {
                viewport
                    .parse::<Viewport>()
                    .map_err(|e| config_err(format!("task '{name}': {e}")))?;
            }
        }
    }

    for pattern in &task.src {
        let glob = pattern.strip_prefix('!').unwrap_or(pattern);
        compile_glob(glob).map_err(|e| config_err(format!("task '{name}': {e:#}")))?;
    }

    if let Some(dest) = &task.dest {
        ensure_inside_root(&format!("task '{name}' dest"), dest)?;
    }

    Ok(())
}

/// Relative and never climbing above the project root.
fn ensure_inside_root(what: &str, path: &str) -> Result<()> {
    let p = Path::new(path);
    let mut depth: i64 = 0;
    for component in p.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(config_err(format!(
                    "{what} '{path}' must be relative to the project root"
                )));
            }
            Component::ParentDir => depth -= 1,
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
        }
        if depth < 0 {
            return Err(config_err(format!(
                "{what} '{path}' escapes the project root"
            )));
        }
    }
    if depth == 0 {
        return Err(config_err(format!("{what} '{path}' is the project root itself")));
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            // petgraph names one node; walk from it to report the members.
            let node = cycle.node_id();
            let dag = DagGraph::from_raw_config(cfg);
            match ExecutionPlan::resolve(&dag, &[node], PlanScope::WithPrerequisites) {
                Err(err @ AssetdagError::DagCycle(_)) => Err(err),
                _ => Err(AssetdagError::DagCycle(vec![node.to_string()])),
            }
        }
    }
}

fn validate_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (i, binding) in cfg.watch.binding.iter().enumerate() {
        if binding.patterns.is_empty() {
            return Err(config_err(format!(
                "[[watch.binding]] #{i} needs at least one pattern"
            )));
        }
        if binding.tasks.is_empty() {
            return Err(config_err(format!(
                "[[watch.binding]] #{i} needs at least one task"
            )));
        }
        for task in &binding.tasks {
            if !cfg.task.contains_key(task) {
                return Err(config_err(format!(
                    "[[watch.binding]] #{i} references unknown task '{task}'"
                )));
            }
        }
        for pattern in binding.patterns.iter().chain(&binding.exclude) {
            compile_glob(pattern)
                .map_err(|e| config_err(format!("[[watch.binding]] #{i}: {e:#}")))?;
        }
    }
    Ok(())
}
