// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build static-site assets from a task graph, and rebuild them on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run together with its prerequisites.
    ///
    /// Default: `[config].default_target` (usually `default`).
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Path to the config file (TOML). Its directory is the project root.
    #[arg(long, value_name = "PATH", default_value = "Assetdag.toml")]
    pub config: PathBuf,

    /// Keep running after the initial build and rebuild on file changes.
    #[arg(long)]
    pub watch: bool,

    /// Serve the public directory with live reload (requires --watch).
    #[arg(long, requires = "watch")]
    pub serve: bool,

    /// Dev server port. Overrides `[serve].port`.
    #[arg(long, value_name = "N")]
    pub port: Option<u16>,

    /// Parse + validate, print the execution plan, but run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// List tasks with their kinds and prerequisites.
    #[arg(long)]
    pub list: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
