// src/dag/registry.rs

//! The task registry: named build steps with prerequisites and actions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::actions::TaskAction;
use crate::dag::graph::DagGraph;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};

/// A named build step.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    after: Vec<TaskName>,
    action: Arc<dyn TaskAction>,
    description: Option<String>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("after", &self.after)
            .field("kind", &self.action.kind())
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new<N: Into<TaskName>>(
        name: N,
        after: Vec<TaskName>,
        action: Arc<dyn TaskAction>,
    ) -> Self {
        Self {
            name: name.into(),
            after,
            action,
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prerequisites, in declaration order.
    pub fn after(&self) -> &[TaskName] {
        &self.after
    }

    pub fn action(&self) -> &Arc<dyn TaskAction> {
        &self.action
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Collects task definitions during initialization.
///
/// Prerequisites may name tasks registered later; they are checked once in
/// [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tasks: BTreeMap<TaskName, Task>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Fails if `name` is already registered.
    pub fn register<N: Into<TaskName>>(
        &mut self,
        name: N,
        after: Vec<TaskName>,
        action: Arc<dyn TaskAction>,
    ) -> Result<&mut Self> {
        self.register_task(Task::new(name, after, action))
    }

    pub fn register_task(&mut self, task: Task) -> Result<&mut Self> {
        if self.tasks.contains_key(&task.name) {
            return Err(AssetdagError::ConfigError(format!(
                "task '{}' is registered more than once",
                task.name
            )));
        }
        debug!(task = %task.name, after = ?task.after, kind = task.action.kind(), "registered task");
        self.tasks.insert(task.name.clone(), task);
        Ok(self)
    }

    /// Finish registration.
    ///
    /// Fails if a task lists itself or a prerequisite that was never
    /// registered. Cycles through several tasks are reported when a plan is
    /// resolved.
    pub fn build(self) -> Result<TaskRegistry> {
        for task in self.tasks.values() {
            for dep in &task.after {
                if dep == &task.name {
                    return Err(AssetdagError::ConfigError(format!(
                        "task '{}' cannot depend on itself in `after`",
                        task.name
                    )));
                }
            }
        }

        let graph = DagGraph::from_edges(
            self.tasks
                .values()
                .map(|t| (t.name.as_str(), t.after.as_slice())),
        );

        if let Some((task, dep)) = graph.first_unknown_dependency() {
            return Err(AssetdagError::ConfigError(format!(
                "task '{}' has unknown dependency '{}' in `after`",
                task, dep
            )));
        }

        Ok(TaskRegistry {
            tasks: self.tasks,
            graph,
        })
    }
}

/// Immutable set of tasks, shared with the scheduler after startup.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
    graph: DagGraph,
}

impl TaskRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up a task by name.
    pub fn resolve(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| AssetdagError::TaskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All tasks, sorted by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
