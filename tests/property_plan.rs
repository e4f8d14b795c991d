use std::collections::{BTreeMap, HashMap};

use assetdag::dag::{ExecutionPlan, PlanScope};
use assetdag_test_utils::fakes::{EventLog, recording_registry};
use proptest::prelude::*;

// Acyclic by construction: task_i may only depend on task_j with j < i.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let mut deps: Vec<usize> =
                            deps.into_iter().filter(|_| i > 0).map(|d| d % i.max(1)).collect();
                        deps.sort();
                        deps.dedup();
                        deps
                    })
                    .collect()
            },
        )
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

proptest! {
    #[test]
    fn every_task_follows_its_prerequisites_exactly_once(
        deps in dag_strategy(12),
        target_seed in any::<usize>(),
    ) {
        let names: Vec<String> = (0..deps.len()).map(name).collect();
        let dep_names: Vec<Vec<&str>> = deps
            .iter()
            .map(|d| d.iter().map(|j| names[*j].as_str()).collect())
            .collect();
        let edges: Vec<(&str, &[&str])> = names
            .iter()
            .zip(&dep_names)
            .map(|(n, d)| (n.as_str(), d.as_slice()))
            .collect();

        let registry = recording_registry(&edges, &BTreeMap::new(), &EventLog::new()).unwrap();
        let target = &names[target_seed % names.len()];
        let plan = ExecutionPlan::resolve(registry.graph(), &[target], PlanScope::WithPrerequisites).unwrap();

        let mut batch_of: HashMap<&str, usize> = HashMap::new();
        for (index, batch) in plan.batches().iter().enumerate() {
            prop_assert!(!batch.is_empty());
            for task in batch {
                prop_assert!(batch_of.insert(task.as_str(), index).is_none(), "{} planned twice", task);
            }
        }

        prop_assert!(batch_of.contains_key(target.as_str()));
        for (task, index) in &batch_of {
            let i: usize = task.trim_start_matches("task_").parse().unwrap();
            for dep in &deps[i] {
                let dep_batch = batch_of.get(names[*dep].as_str());
                prop_assert!(dep_batch.is_some(), "prerequisite {} of {} missing", dep, task);
                prop_assert!(dep_batch.unwrap() < index);
            }
        }
    }
}
