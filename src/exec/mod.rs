// src/exec/mod.rs

//! Execution layer.
//!
//! - [`process`] runs external tools (`ToolRunner`, `ShellToolRunner`).
//! - [`backend`] provides the `Rebuilder` trait the watch runtime uses to
//!   start rebuilds, and `SchedulerRebuilder`, which tests replace with a
//!   fake.

pub mod backend;
pub mod process;

pub use backend::{Rebuilder, SchedulerRebuilder};
pub use process::{ShellToolRunner, ToolFuture, ToolInvocation, ToolRunner};
