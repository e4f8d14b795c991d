use std::fs;
use std::path::{Path, PathBuf};

use assetdag::cli::CliArgs;
use assetdag::errors::AssetdagError;
use assetdag::run;
use assetdag_test_utils::{init_tracing, with_timeout};
use tempfile::TempDir;

const SITE: &str = r#"
[project]
name = "mysite"

[config]
default_target = "site"
work_dir = ".tmp"

[task.styles]
kind = "command"
cmd = "echo styles > styles.out"

[task.site]
after = ["styles"]

[task.broken]
kind = "command"
after = ["styles"]
cmd = "exit 3"
"#;

/// Project dir with the config above and a stale file in the work dir.
fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Assetdag.toml");
    fs::write(&config, SITE).unwrap();
    fs::create_dir_all(dir.path().join(".tmp")).unwrap();
    fs::write(dir.path().join(".tmp/stale.txt"), "left over").unwrap();
    (dir, config)
}

fn args(config: &Path) -> CliArgs {
    CliArgs {
        target: None,
        config: config.to_path_buf(),
        watch: false,
        serve: false,
        port: None,
        dry_run: false,
        list: false,
        log_level: None,
    }
}

#[tokio::test]
async fn default_target_runs_and_work_dir_starts_empty() {
    init_tracing();
    let (dir, config) = project();

    with_timeout(run(args(&config))).await.unwrap();

    assert!(dir.path().join("styles.out").is_file());
    assert!(dir.path().join(".tmp").is_dir());
    assert!(!dir.path().join(".tmp/stale.txt").exists());
}

#[tokio::test]
async fn dry_run_and_list_touch_nothing() {
    let (dir, config) = project();

    let dry_run = CliArgs {
        dry_run: true,
        ..args(&config)
    };
    with_timeout(run(dry_run)).await.unwrap();

    let list = CliArgs {
        list: true,
        ..args(&config)
    };
    with_timeout(run(list)).await.unwrap();

    assert!(!dir.path().join("styles.out").exists());
    assert!(dir.path().join(".tmp/stale.txt").is_file());
}

#[tokio::test]
async fn failing_task_is_named_in_the_error() {
    let (dir, config) = project();

    let broken = CliArgs {
        target: Some("broken".to_string()),
        ..args(&config)
    };
    let err = with_timeout(run(broken)).await.unwrap_err();

    assert!(
        err.to_string().starts_with("task 'broken' failed: "),
        "unexpected error: {err}"
    );
    let err = err.downcast_ref::<AssetdagError>().unwrap();
    assert_eq!(err.failed_task(), Some("broken"));
    // The prerequisite ran before the failure.
    assert!(dir.path().join("styles.out").is_file());
}

#[tokio::test]
async fn unknown_target_aborts_before_clearing_the_work_dir() {
    let (dir, config) = project();

    let typo = CliArgs {
        target: Some("stlyes".to_string()),
        ..args(&config)
    };
    let err = with_timeout(run(typo)).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AssetdagError>(),
        Some(AssetdagError::TaskNotFound(name)) if name == "stlyes"
    ));
    assert!(dir.path().join(".tmp/stale.txt").is_file());
    assert!(!dir.path().join("styles.out").exists());
}
