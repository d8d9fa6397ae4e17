// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor's flag surface, implemented with `clap` derive macros
//! in flat (subcommand-free) style.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Assistant session supervisor")]
pub struct Cli {
    /// Run continuously instead of a single cycle.
    #[arg(long)]
    pub continuous: bool,

    /// Minutes between monitor cycles in continuous mode.
    #[arg(long = "check-interval", value_name = "MIN", default_value_t = 5)]
    pub check_interval: u64,

    /// Stop after N cycles (continuous mode only). Unset = unbounded.
    #[arg(long = "max-cycles", value_name = "N")]
    pub max_cycles: Option<u64>,

    /// Operate on the queue only; do not start the monitor loop.
    #[arg(long = "queue-mode")]
    pub queue_mode: bool,

    /// Enqueue a tracker issue by number.
    #[arg(long = "add-issue", value_name = "N", conflicts_with_all = ["add_pr", "add_custom"])]
    pub add_issue: Option<u64>,

    /// Enqueue a tracker pull request by number.
    #[arg(long = "add-pr", value_name = "N", conflicts_with_all = ["add_issue", "add_custom"])]
    pub add_pr: Option<u64>,

    /// Enqueue a custom free-text command.
    #[arg(long = "add-custom", value_name = "DESC", conflicts_with_all = ["add_issue", "add_pr"])]
    pub add_custom: Option<String>,

    /// Print the queue and exit.
    #[arg(long = "list-queue", conflicts_with = "clear_queue")]
    pub list_queue: bool,

    /// Remove every task from the queue and exit.
    #[arg(long = "clear-queue")]
    pub clear_queue: bool,

    /// Pause dispatch without affecting in-progress work.
    #[arg(long = "pause-queue", conflicts_with_all = ["resume_queue", "skip_current", "retry_current"])]
    pub pause_queue: bool,

    /// Resume a paused queue.
    #[arg(long = "resume-queue", conflicts_with_all = ["pause_queue", "skip_current", "retry_current"])]
    pub resume_queue: bool,

    /// Fail the current task and move on without retrying it.
    #[arg(long = "skip-current", conflicts_with_all = ["pause_queue", "resume_queue", "retry_current"])]
    pub skip_current: bool,

    /// Re-queue the current task immediately.
    #[arg(long = "retry-current", conflicts_with_all = ["pause_queue", "resume_queue", "skip_current"])]
    pub retry_current: bool,

    /// Timeout in seconds for a newly-added task.
    #[arg(long = "queue-timeout", value_name = "SEC", value_parser = clap::value_parser!(u64).range(60..=86400))]
    pub queue_timeout: Option<u64>,

    /// Max retries for a newly-added task.
    #[arg(long = "queue-retries", value_name = "N", value_parser = clap::value_parser!(u32).range(0..=10))]
    pub queue_retries: Option<u32>,

    /// Dispatch priority for a newly-added task (lower runs first).
    #[arg(long = "queue-priority", value_name = "P", value_parser = clap::value_parser!(i32).range(1..=10))]
    pub queue_priority: Option<i32>,

    /// Load configuration overrides from this TOML file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report what would happen without mutating the queue or starting a session.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Verbose stderr logging (target/span context, debug level).
    #[arg(long)]
    pub debug: bool,

    /// Arguments forwarded to the assistant CLI invocation.
    #[arg(last = true)]
    pub passthrough: Vec<String>,
}
