// src/engine/rebuild.rs

use std::collections::BTreeSet;

use crate::engine::{BindingId, BindingInfo, TaskName};

/// A rebuild the core wants the shell to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildRequest {
    pub id: u64,
    /// Bindings whose triggers this rebuild covers.
    pub bindings: Vec<BindingId>,
    /// Union of the bindings' tasks, deduplicated, in first-seen order.
    pub tasks: Vec<TaskName>,
    /// Whether a successful rebuild should notify browsers.
    pub reload: bool,
}

impl RebuildRequest {
    pub(crate) fn for_bindings(id: u64, bindings: &[BindingId], table: &[BindingInfo]) -> Self {
        let ids: Vec<BindingId> = bindings
            .iter()
            .copied()
            .filter(|b| *b < table.len())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tasks: Vec<TaskName> = Vec::new();
        let mut reload = false;
        for &b in &ids {
            let info = &table[b];
            reload |= info.reload;
            for task in &info.tasks {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }

        Self {
            id,
            bindings: ids,
            tasks,
            reload,
        }
    }
}

/// How a rebuild ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Success,
    Failed {
        /// The task that failed, when the failure came from an action.
        task: Option<TaskName>,
        message: String,
    },
}

impl RebuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RebuildOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(tasks: &[&str], reload: bool) -> BindingInfo {
        BindingInfo {
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            reload,
        }
    }

    #[test]
    fn merges_tasks_and_reload_flags() {
        let table = vec![info(&["styles"], false), info(&["styles", "html"], true)];
        let req = RebuildRequest::for_bindings(7, &[1, 0, 1], &table);

        assert_eq!(req.id, 7);
        assert_eq!(req.bindings, vec![0, 1]);
        assert_eq!(req.tasks, vec!["styles".to_string(), "html".to_string()]);
        assert!(req.reload);
    }
}
