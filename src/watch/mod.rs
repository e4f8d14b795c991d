// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch.binding]]` patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of events into one trigger per binding.
//!
//! It does **not** know about the task graph; it only turns filesystem
//! changes into binding-level triggers for the engine.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{bindings_for_paths, is_relevant};
pub use patterns::{WatchBinding, build_watch_bindings};
pub use watcher::{WatcherHandle, collect_debounced, spawn_watcher};
