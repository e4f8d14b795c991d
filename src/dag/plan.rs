// src/dag/plan.rs

//! Resolution of requested targets into an ordered sequence of batches.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::dag::graph::DagGraph;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};

/// Which tasks a plan includes besides the requested targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanScope {
    /// Targets plus the transitive closure of their prerequisites.
    WithPrerequisites,
    /// Only the targets, ordered among themselves by their transitive
    /// prerequisite relation. Used for watch-triggered rebuilds.
    TargetsOnly,
}

/// Ordered batches for one invocation.
///
/// Batches run strictly in sequence; the tasks inside one batch have no
/// ordering constraints between them. A plan is recomputed for every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    targets: Vec<TaskName>,
    batches: Vec<Vec<TaskName>>,
}

impl ExecutionPlan {
    /// Resolve `targets` against `graph`.
    ///
    /// Fails with `TaskNotFound` for an unknown target or prerequisite and with
    /// `DagCycle` (members in traversal order) if a cycle is reachable from
    /// the targets. Shared prerequisites appear exactly once.
    pub fn resolve<S: AsRef<str>>(
        graph: &DagGraph,
        targets: &[S],
        scope: PlanScope,
    ) -> Result<Self> {
        let mut traversal = Traversal::new(graph);
        let mut requested: Vec<&str> = Vec::with_capacity(targets.len());

        for target in targets {
            let target = target.as_ref();
            if !graph.contains(target) {
                return Err(AssetdagError::TaskNotFound(target.to_string()));
            }
            if !requested.contains(&target) {
                requested.push(target);
            }
            traversal.visit(target)?;
        }

        let members: HashSet<&str> = match scope {
            PlanScope::WithPrerequisites => traversal.order.iter().copied().collect(),
            PlanScope::TargetsOnly => requested.iter().copied().collect(),
        };

        // Post-order guarantees every prerequisite is levelled before its
        // dependents.
        let mut levels: HashMap<&str, usize> = HashMap::new();
        for &name in &traversal.order {
            if !members.contains(name) {
                continue;
            }
            let level = nearest_members(graph, name, &members)
                .into_iter()
                .filter_map(|dep| levels.get(dep).map(|l| l + 1))
                .max()
                .unwrap_or(0);
            levels.insert(name, level);
        }

        let mut grouped: BTreeMap<usize, Vec<TaskName>> = BTreeMap::new();
        for (name, level) in levels {
            grouped.entry(level).or_default().push(name.to_string());
        }
        let batches: Vec<Vec<TaskName>> = grouped
            .into_values()
            .map(|mut batch| {
                batch.sort();
                batch
            })
            .collect();

        debug!(targets = ?requested, ?scope, ?batches, "resolved execution plan");

        Ok(Self {
            targets: requested.into_iter().map(str::to_string).collect(),
            batches,
        })
    }

    pub fn targets(&self) -> &[TaskName] {
        &self.targets
    }

    pub fn batches(&self) -> &[Vec<TaskName>] {
        &self.batches
    }

    /// Number of tasks across all batches.
    pub fn len(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// All tasks, linearized batch by batch.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.batches.iter().flatten().map(String::as_str)
    }

    /// Index of the batch containing `task`.
    pub fn batch_of(&self, task: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|t| t == task))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first walk over prerequisites collecting a post-order.
struct Traversal<'a> {
    graph: &'a DagGraph,
    marks: HashMap<&'a str, Mark>,
    stack: Vec<&'a str>,
    order: Vec<&'a str>,
}

impl<'a> Traversal<'a> {
    fn new(graph: &'a DagGraph) -> Self {
        Self {
            graph,
            marks: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
        }
    }

    fn visit(&mut self, name: &'a str) -> Result<()> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = self.stack.iter().position(|n| *n == name).unwrap_or(0);
                let members = self.stack[start..].iter().map(|n| n.to_string()).collect();
                return Err(AssetdagError::DagCycle(members));
            }
            None => {}
        }

        if !self.graph.contains(name) {
            return Err(AssetdagError::TaskNotFound(name.to_string()));
        }

        self.marks.insert(name, Mark::Visiting);
        self.stack.push(name);

        let graph = self.graph;
        for dep in graph.dependencies_of(name) {
            self.visit(dep.as_str())?;
        }

        self.stack.pop();
        self.marks.insert(name, Mark::Done);
        self.order.push(name);
        Ok(())
    }
}

/// Closest prerequisites of `name` that are plan members, looking through
/// non-member tasks.
fn nearest_members<'a>(
    graph: &'a DagGraph,
    name: &str,
    members: &HashSet<&str>,
) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&'a str> = graph
        .dependencies_of(name)
        .iter()
        .map(String::as_str)
        .collect();

    while let Some(dep) = stack.pop() {
        if !seen.insert(dep) {
            continue;
        }
        if members.contains(dep) {
            found.push(dep);
        } else {
            stack.extend(graph.dependencies_of(dep).iter().map(String::as_str));
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DagGraph {
        let owned: Vec<(String, Vec<TaskName>)> = edges
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect();
        DagGraph::from_edges(owned.iter().map(|(n, d)| (n.as_str(), d.as_slice())))
    }

    #[test]
    fn independent_siblings_share_a_batch() {
        let g = graph(&[
            ("styles", &[]),
            ("lint", &["styles"]),
            ("scripts", &["styles"]),
            ("images", &["styles"]),
            ("default", &["styles", "lint", "scripts", "images"]),
        ]);

        let plan = ExecutionPlan::resolve(&g, &["default"], PlanScope::WithPrerequisites).unwrap();
        assert_eq!(
            plan.batches(),
            &[
                vec!["styles".to_string()],
                vec!["images".to_string(), "lint".to_string(), "scripts".to_string()],
                vec!["default".to_string()],
            ]
        );
    }

    #[test]
    fn targets_only_keeps_transitive_order() {
        let g = graph(&[("styles", &[]), ("html", &["styles"]), ("strip", &["html"])]);

        let plan =
            ExecutionPlan::resolve(&g, &["strip", "styles"], PlanScope::TargetsOnly).unwrap();
        assert_eq!(
            plan.batches(),
            &[vec!["styles".to_string()], vec!["strip".to_string()]]
        );
    }

    #[test]
    fn self_cycle_names_the_task() {
        let g = graph(&[("a", &["a"])]);
        let err = ExecutionPlan::resolve(&g, &["a"], PlanScope::WithPrerequisites).unwrap_err();
        match err {
            AssetdagError::DagCycle(members) => assert_eq!(members, vec!["a".to_string()]),
            other => panic!("expected DagCycle, got {other:?}"),
        }
    }
}
