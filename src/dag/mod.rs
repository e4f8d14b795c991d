// src/dag/mod.rs

//! Task registry, plan resolution and batch scheduling.
//!
//! - [`graph`] holds adjacency information for the task graph.
//! - [`registry`] owns the task definitions (name, prerequisites, action).
//! - [`plan`] resolves targets into ordered batches, detecting cycles.
//! - [`scheduler`] executes plans: batches in sequence, tasks within a batch
//!   concurrently, fail-fast.
//! - [`report`] records per-task states for one run.

pub mod graph;
pub mod plan;
pub mod registry;
pub mod report;
pub mod scheduler;

pub use graph::DagGraph;
pub use plan::{ExecutionPlan, PlanScope};
pub use registry::{RegistryBuilder, Task, TaskRegistry};
pub use report::{RunReport, TaskRunState};
pub use scheduler::{RunFailure, Scheduler};
