// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wardend - the continuous assistant-session supervisor.
//!
//! Background process that drives one project's `MonitorLoop` to
//! completion, independent of any interactive CLI invocation. Exits 0 on
//! a clean shutdown signal, non-zero on an unrecoverable lock or
//! configuration failure.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Duration;
use tracing::{error, info, warn};
use warden_adapters::TmuxAdapter;
use warden_core::clock::SystemClock;
use warden_core::config::Config;
use warden_daemon::{init_logging, DaemonLock, Paths};
use warden_engine::session_manager::{project_id, SessionManager};
use warden_engine::{CycleOutcome, MonitorLoop};

#[tokio::main]
async fn main() {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("wardend {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--help" | "-h" => {
                println!("wardend [--project-dir DIR] [--config FILE]");
                return;
            }
            _ => {}
        }
    }

    if let Err(err) = run().await {
        eprintln!("wardend: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let project_dir = parse_project_dir().unwrap_or(std::env::current_dir()?);
    let project_dir = project_dir.canonicalize()?;
    let config_path = parse_config_path();

    let config = match config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)?;
            Config::from_toml_str(&contents)?
        }
        None => Config::default(),
    };

    let pid = project_id(&project_dir);
    let paths = Paths::resolve(&pid)?;
    let _guard = init_logging(&paths.log_dir, &config.log_level)?;
    let _lock = DaemonLock::acquire(&paths.pid_path)?;

    info!(project = %pid, dir = %project_dir.display(), "wardend starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_signal_watcher(Arc::clone(&shutdown))?;

    let queue_dir = project_dir.join("queue");
    let adapter = TmuxAdapter::new();
    let session_manager = SessionManager::new(
        adapter,
        config.max_tracked_sessions,
        config.stopped_session_cleanup_minutes * 60,
        config.error_session_cleanup_minutes * 60,
    );
    let assistant_command = std::env::var("WARDEN_ASSISTANT_COMMAND").unwrap_or_else(|_| "claude".to_string());
    let check_interval = Duration::from_secs(config.check_interval_minutes.max(1) * 60);
    let mut monitor = MonitorLoop::new(
        queue_dir,
        session_manager,
        config,
        pid.as_str(),
        project_dir.as_path(),
        assistant_command,
    );
    let clock = SystemClock;

    while !shutdown.load(Ordering::Relaxed) {
        match monitor.run_one_cycle(&clock).await {
            Ok(CycleOutcome::WaitingOnUsageLimit { remaining_secs }) => {
                info!(remaining_secs, "paused on usage limit");
                sleep_interruptible(Duration::from_secs(remaining_secs.min(check_interval.as_secs())), &shutdown).await;
            }
            Ok(outcome) => {
                info!(?outcome, "cycle complete");
                sleep_interruptible(check_interval, &shutdown).await;
            }
            Err(err) => {
                error!(%err, "monitor cycle failed");
                sleep_interruptible(check_interval, &shutdown).await;
            }
        }
    }

    info!("wardend shutting down");
    Ok(())
}

fn parse_project_dir() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--project-dir")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn parse_config_path() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn spawn_signal_watcher(shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => warn!("received SIGTERM"),
            _ = sigint.recv() => warn!("received SIGINT"),
        }
        shutdown.store(true, Ordering::Relaxed);
    });
    Ok(())
}

async fn sleep_interruptible(duration: Duration, shutdown: &AtomicBool) {
    let deadline = tokio::time::Instant::now() + duration;
    while tokio::time::Instant::now() < deadline {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500).min(duration)).await;
    }
}
