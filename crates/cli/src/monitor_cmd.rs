// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives the monitor loop in-process for `warden` (foreground, bounded
//! by `--max-cycles` or `--continuous`). The always-on background
//! supervisor is `wardend`, a separate binary — this
//! module never spawns it, it only runs the same [`MonitorLoop`] for a
//! handful of cycles on behalf of an interactive operator.

use crate::exit_error;
use std::path::Path;
use tokio::time::Duration;
use tracing::info;
use warden_adapters::TmuxAdapter;
use warden_core::clock::SystemClock;
use warden_core::config::Config;
use warden_engine::session_manager::SessionManager;
use warden_engine::{CycleOutcome, MonitorLoop};

pub struct MonitorArgs {
    pub check_interval: Duration,
    pub max_cycles: Option<u64>,
}

/// Run the monitor loop to completion (bounded by `max_cycles` when set,
/// or a single cycle when `continuous` is false).
pub async fn run(
    queue_dir: &Path,
    project_dir: &Path,
    project_name: &str,
    assistant_command: String,
    config: Config,
    continuous: bool,
    args: MonitorArgs,
) -> anyhow::Result<()> {
    let adapter = TmuxAdapter::new();
    let session_manager = SessionManager::new(
        adapter,
        config.max_tracked_sessions,
        config.stopped_session_cleanup_minutes * 60,
        config.error_session_cleanup_minutes * 60,
    );
    let mut monitor = MonitorLoop::new(
        queue_dir.to_path_buf(),
        session_manager,
        config,
        project_name,
        project_dir,
        assistant_command,
    );
    let clock = SystemClock;

    // A malformed pause marker means we genuinely can't tell whether a
    // usage-limit pause is active; surface that distinctly rather than
    // silently proceeding as if it weren't.
    monitor
        .check_usage_limit_status()
        .map_err(|e| exit_error::usage_limit_failure(format!("could not determine usage-limit pause state: {e}")))?;

    let mut cycles_run = 0u64;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                return Err(crate::exit_error::interrupted());
            }
            result = monitor.run_one_cycle(&clock) => result?,
        };
        cycles_run += 1;
        report(&outcome);

        if !continuous {
            break;
        }
        if let Some(max) = args.max_cycles {
            if cycles_run >= max {
                break;
            }
        }

        let wait = match outcome {
            CycleOutcome::WaitingOnUsageLimit { remaining_secs } => {
                Duration::from_secs(remaining_secs.min(args.check_interval.as_secs().max(1)))
            }
            _ => args.check_interval,
        };
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => return Err(crate::exit_error::interrupted()),
            _ = tokio::time::sleep(wait) => {}
        }
    }

    Ok(())
}

fn report(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Idle => info!("queue is idle"),
        CycleOutcome::WaitingOnUsageLimit { remaining_secs } => {
            info!(remaining_secs, "waiting on usage limit")
        }
        CycleOutcome::TaskCompleted { task_id } => info!(task_id, "task completed"),
        CycleOutcome::TaskFailed { task_id, reason } => info!(task_id, reason, "task failed"),
        CycleOutcome::TaskTimedOut { task_id } => info!(task_id, "task timed out"),
        CycleOutcome::UsageLimitDetected { task_id, wait_seconds } => {
            info!(?task_id, wait_seconds, "usage limit detected")
        }
    }
}
