// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden - interactive control surface for a project's task queue and
//! assistant-session monitor. The always-on background
//! process is the separate `wardend` binary; this binary is the thing an
//! operator types.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cli;
mod config;
mod exit_error;
mod monitor_cmd;
mod queue_ops;

use clap::Parser;
use cli::Cli;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use warden_core::task::TaskType;
use warden_storage::{BackoffMode, LockManager};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = cli.debug;
    init_tracing(debug);

    if let Err(e) = run(cli).await {
        let code = e.downcast_ref::<exit_error::ExitError>().map_or(1, |c| c.code);
        eprintln!("warden: {e:#}");
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(debug).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let project_dir = std::env::current_dir()?.canonicalize()?;
    let config = config::load(cli.config.as_deref())?;
    let project_id = warden_engine::session_manager::project_id(&project_dir);
    let queue_dir = project_dir.join("queue");
    std::fs::create_dir_all(&queue_dir)?;
    let lock_manager = LockManager::new(&queue_dir, BackoffMode::Cli);

    if cli.list_queue {
        print!("{}", queue_ops::list_queue(&queue_dir)?);
        return Ok(());
    }

    if cli.clear_queue {
        let removed = queue_ops::clear_queue(&queue_dir, &lock_manager, cli.dry_run)?;
        println!("removed {removed} task(s)");
        return Ok(());
    }

    if cli.pause_queue {
        queue_ops::set_paused(&queue_dir, &lock_manager, true, cli.dry_run)?;
        println!("queue paused");
        return Ok(());
    }

    if cli.resume_queue {
        queue_ops::set_paused(&queue_dir, &lock_manager, false, cli.dry_run)?;
        println!("queue resumed");
        return Ok(());
    }

    if cli.skip_current {
        match queue_ops::skip_current(&queue_dir, &lock_manager, cli.dry_run)? {
            Some(id) => println!("skipped {id}"),
            None => println!("no task in progress"),
        }
        return Ok(());
    }

    if cli.retry_current {
        match queue_ops::retry_current(&queue_dir, &lock_manager, cli.dry_run)? {
            Some(id) => println!("retrying {id}"),
            None => println!("no task in progress"),
        }
        return Ok(());
    }

    if let Some(new_task) = new_task_from_cli(&cli)? {
        let id = queue_ops::add_task(&queue_dir, &lock_manager, &config, new_task, cli.dry_run)?;
        println!("queued {id}");
        if cli.queue_mode || cli.dry_run {
            return Ok(());
        }
    }

    if cli.queue_mode {
        return Ok(());
    }

    let assistant_command = assistant_command_from(&cli);
    monitor_cmd::run(
        &queue_dir,
        &project_dir,
        &project_id,
        assistant_command,
        config,
        cli.continuous,
        monitor_cmd::MonitorArgs {
            check_interval: Duration::from_secs(cli.check_interval.max(1) * 60),
            max_cycles: cli.max_cycles,
        },
    )
    .await
}

fn new_task_from_cli(cli: &Cli) -> anyhow::Result<Option<queue_ops::NewTask>> {
    let new_task = if let Some(number) = cli.add_issue {
        Some(queue_ops::NewTask {
            task_type: TaskType::TrackerIssue,
            tracker_number: Some(number),
            command: None,
            priority: cli.queue_priority,
            timeout_seconds: cli.queue_timeout,
            max_retries: cli.queue_retries,
        })
    } else if let Some(number) = cli.add_pr {
        Some(queue_ops::NewTask {
            task_type: TaskType::TrackerPr,
            tracker_number: Some(number),
            command: None,
            priority: cli.queue_priority,
            timeout_seconds: cli.queue_timeout,
            max_retries: cli.queue_retries,
        })
    } else if let Some(command) = cli.add_custom.clone() {
        Some(queue_ops::NewTask {
            task_type: TaskType::Custom,
            tracker_number: None,
            command: Some(command),
            priority: cli.queue_priority,
            timeout_seconds: cli.queue_timeout,
            max_retries: cli.queue_retries,
        })
    } else {
        None
    };
    Ok(new_task)
}

fn assistant_command_from(cli: &Cli) -> String {
    if cli.passthrough.is_empty() {
        std::env::var("WARDEN_ASSISTANT_COMMAND").unwrap_or_else(|_| "claude".to_string())
    } else {
        cli.passthrough.join(" ")
    }
}
