// src/dag/report.rs

//! Per-run task states.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::dag::plan::ExecutionPlan;
use crate::engine::TaskName;

/// Terminal (or current) state of a task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Part of the plan but its batch was never started.
    NotStarted,
    /// Dispatched and not yet finished.
    Running,
    Succeeded,
    Failed,
    /// Was running in the same batch as a failing task and got cancelled.
    Aborted,
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone)]
pub struct RunReport {
    run_id: u64,
    batches: Vec<Vec<TaskName>>,
    states: BTreeMap<TaskName, TaskRunState>,
    failed_task: Option<TaskName>,
    elapsed: Duration,
}

impl RunReport {
    pub(crate) fn new(run_id: u64, plan: &ExecutionPlan) -> Self {
        let states = plan
            .tasks()
            .map(|t| (t.to_string(), TaskRunState::NotStarted))
            .collect();
        Self {
            run_id,
            batches: plan.batches().to_vec(),
            states,
            failed_task: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn set(&mut self, task: &str, state: TaskRunState) {
        if let Some(slot) = self.states.get_mut(task) {
            *slot = state;
        }
        if state == TaskRunState::Failed && self.failed_task.is_none() {
            self.failed_task = Some(task.to_string());
        }
    }

    /// Mark everything still `Running` as `Aborted`.
    pub(crate) fn abort_running(&mut self) {
        for state in self.states.values_mut() {
            if *state == TaskRunState::Running {
                *state = TaskRunState::Aborted;
            }
        }
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn batches(&self) -> &[Vec<TaskName>] {
        &self.batches
    }

    pub fn state_of(&self, task: &str) -> Option<TaskRunState> {
        self.states.get(task).copied()
    }

    pub fn count(&self, state: TaskRunState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    pub fn succeeded(&self) -> bool {
        self.states.values().all(|s| *s == TaskRunState::Succeeded)
    }

    pub fn failed_task(&self) -> Option<&str> {
        self.failed_task.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
