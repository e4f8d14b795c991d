// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::config::model::RawConfigFile;
use crate::engine::TaskName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct prerequisites, in declaration order.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that list this one in their `after`.
    dependents: Vec<TaskName>,
}

/// In-memory task graph keyed by task name.
///
/// Holds adjacency only. Acyclicity is checked by the plan resolver and by
/// config validation, not here, so a `DagGraph` may briefly describe a broken
/// graph while it is being validated.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build a graph from `(task, prerequisites)` pairs.
    ///
    /// Prerequisites naming unknown tasks are kept in the dependency list (so
    /// the resolver can report them) but get no dependents entry.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [TaskName])>,
    {
        let mut nodes: BTreeMap<TaskName, DagNode> = BTreeMap::new();

        // First pass: create nodes with their dependency lists.
        for (name, deps) in edges {
            nodes.insert(
                name.to_string(),
                DagNode {
                    deps: deps.to_vec(),
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        let pairs: Vec<(TaskName, TaskName)> = nodes
            .iter()
            .flat_map(|(name, node)| node.deps.iter().map(move |d| (d.clone(), name.clone())))
            .collect();

        for (dep, dependent) in pairs {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.push(dependent);
            }
        }

        Self { nodes }
    }

    /// Build the graph described by a raw (not yet validated) config.
    pub fn from_raw_config(cfg: &RawConfigFile) -> Self {
        Self::from_edges(
            cfg.task
                .iter()
                .map(|(name, task)| (name.as_str(), task.after.as_slice())),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return all task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one in their `after`).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// First `(task, prerequisite)` pair whose prerequisite is not a task.
    pub fn first_unknown_dependency(&self) -> Option<(&str, &str)> {
        self.nodes.iter().find_map(|(name, node)| {
            node.deps
                .iter()
                .find(|d| !self.nodes.contains_key(d.as_str()))
                .map(|d| (name.as_str(), d.as_str()))
        })
    }
}
