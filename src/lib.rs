// src/lib.rs

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod serve;
pub mod types;
pub mod watch;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::actions::{build_context, build_registry};
use crate::cli::CliArgs;
use crate::config::loader::{config_root_dir, load_and_validate};
use crate::config::model::ConfigFile;
use crate::dag::{ExecutionPlan, PlanScope, Scheduler, TaskRegistry};
use crate::errors::AssetdagError;
use crate::engine::{BindingInfo, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::SchedulerRebuilder;
use crate::serve::{ReloadHub, ServerHandle, spawn_server};
use crate::watch::{WatcherHandle, build_watch_bindings, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the task registry and action context
/// - the one-shot run of the requested target
/// - (with `--watch`) file watcher, watch runtime, optional dev server
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let root = config_root_dir(&args.config);
    let registry = Arc::new(build_registry(&cfg)?);

    let target = args
        .target
        .clone()
        .unwrap_or_else(|| cfg.config.default_target.clone());

    if args.list {
        print_task_list(&registry);
        return Ok(());
    }

    // Unknown targets abort here, before anything on disk is touched.
    let plan = ExecutionPlan::resolve(registry.graph(), &[&target], PlanScope::WithPrerequisites)?;

    if args.dry_run {
        print_dry_run(&target, &plan);
        return Ok(());
    }

    let ctx = Arc::new(build_context(&cfg, &root)?);
    let scheduler = Scheduler::new(registry, ctx);

    // Watch from the start so edits made during the initial build queue up.
    let session = if args.watch {
        Some(WatchSession::start(&args, &cfg, &root).await?)
    } else {
        None
    };

    clear_work_dir(&cfg, &root).await?;
    let initial = scheduler.execute(&plan).await.map_err(AssetdagError::from);

    let Some(session) = session else {
        let report = initial?;
        info!(
            target = %target,
            tasks = report.count(crate::dag::TaskRunState::Succeeded),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "build finished"
        );
        return Ok(());
    };

    if let Err(err) = &initial {
        error!(target = %target, error = %err, "initial build failed; watching anyway");
    }

    session.run(&cfg, scheduler).await
}

/// Watcher, dev server and Ctrl-C handler for `--watch`.
struct WatchSession {
    tx: mpsc::Sender<RuntimeEvent>,
    rx: mpsc::Receiver<RuntimeEvent>,
    reload: ReloadHub,
    _server: Option<ServerHandle>,
    _watcher: WatcherHandle,
}

impl WatchSession {
    async fn start(args: &CliArgs, cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let reload = ReloadHub::default();

        let server = if args.serve {
            let port = args.port.unwrap_or(cfg.serve.port);
            let dir = root.join(cfg.serve.dir.as_deref().unwrap_or(&cfg.config.public_dir));
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let server = spawn_server(addr, dir, reload.clone()).await?;
            println!("assetdag: serving on http://{}", server.local_addr);
            Some(server)
        } else {
            None
        };

        let bindings = build_watch_bindings(cfg.bindings())?;
        if bindings.is_empty() {
            warn!("no [[watch.binding]] entries; file changes will not trigger rebuilds");
        }
        let watcher = spawn_watcher(
            root,
            bindings,
            Duration::from_millis(cfg.watch.debounce_ms),
            tx.clone(),
        )?;

        // Ctrl-C → graceful shutdown.
        {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("assetdag: failed to listen for Ctrl+C: {e}");
                    return;
                }
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        Ok(Self {
            tx,
            rx,
            reload,
            _server: server,
            _watcher: watcher,
        })
    }

    /// Run the watch runtime until Ctrl-C.
    async fn run(self, cfg: &ConfigFile, scheduler: Scheduler) -> Result<()> {
        let core = CoreRuntime::new(
            cfg.bindings().iter().map(BindingInfo::from).collect(),
            cfg.watch.queue_length,
            RuntimeOptions::default(),
        );
        let rebuilder = SchedulerRebuilder::new(scheduler, self.tx);

        Runtime::new(core, self.rx, rebuilder, self.reload).run().await?;
        Ok(())
    }
}

/// Empty `[config].work_dir` so every run starts from scratch.
async fn clear_work_dir(cfg: &ConfigFile, root: &Path) -> Result<()> {
    let Some(work_dir) = &cfg.config.work_dir else {
        return Ok(());
    };
    let path = root.join(work_dir);

    match tokio::fs::remove_dir_all(&path).await {
        Ok(()) => debug!(path = ?path, "cleared work dir"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("clearing work dir {:?}", path)),
    }
    tokio::fs::create_dir_all(&path)
        .await
        .with_context(|| format!("creating work dir {:?}", path))
}

fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for task in registry.tasks() {
        println!("  - {} [{}]", task.name(), task.action().kind());
        if let Some(description) = task.description() {
            println!("      {description}");
        }
        if !task.after().is_empty() {
            println!("      after: {}", task.after().join(", "));
        }
    }
}

fn print_dry_run(target: &str, plan: &ExecutionPlan) {
    println!("assetdag dry-run: {target}");
    for (i, batch) in plan.batches().iter().enumerate() {
        println!("  batch {i}: {}", batch.join(", "));
    }
    debug!(tasks = plan.len(), "dry-run complete (no execution)");
}
