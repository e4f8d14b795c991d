// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate task kinds, references, cycles and watch bindings
//!   (`validate.rs`, via `TryFrom<RawConfigFile> for ConfigFile`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ActionKind, BindingConfig, ConfigFile, ConfigSection, ProjectSection, RawConfigFile,
    ServeSection, TaskConfig, WatchSection,
};
