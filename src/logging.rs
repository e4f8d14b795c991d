// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ASSETDAG_LOG` environment variable (a level such as `debug`, or full
//!    directives such as `assetdag=debug,tower_http=info`)
//! 3. default to `info`
//!
//! Logs go to STDERR so stdout stays free for `--list` / `--dry-run` output.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETDAG_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = resolve_filter(cli_level, env_value.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))
}

fn resolve_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_str());
    }
    env_value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_env() {
        let filter = resolve_filter(Some(LogLevel::Warn), Some("trace"));
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn env_directives_are_used_when_no_flag() {
        let filter = resolve_filter(None, Some("assetdag=debug"));
        assert_eq!(filter.to_string(), "assetdag=debug");
    }

    #[test]
    fn garbage_env_falls_back_to_info() {
        let filter = resolve_filter(None, Some("assetdag=loud"));
        assert_eq!(filter.to_string(), "info");
    }
}
