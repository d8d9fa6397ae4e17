// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue mutations driven by the flat CLI flags.
//! Every mutation is scoped under `LockType::Write` the same way the
//! monitor loop scopes its own queue edits.

use crate::exit_error;
use std::path::Path;
use uuid::Uuid;
use warden_core::clock::{Clock, SystemClock};
use warden_core::config::Config;
use warden_core::lock::LockType;
use warden_core::task::{Task, TaskConfig, TaskType};
use warden_storage::{AttemptBudget, LockManager, QueueStore};

fn with_write_lock<T>(lock_manager: &LockManager, operation: &str, f: impl FnOnce() -> T) -> anyhow::Result<T> {
    lock_manager
        .with_lock(LockType::Write, operation, AttemptBudget::Quick, f)
        .map_err(|e| anyhow::anyhow!("acquiring queue lock: {e}"))
}

pub struct NewTask {
    pub task_type: TaskType,
    pub tracker_number: Option<u64>,
    pub command: Option<String>,
    pub priority: Option<i32>,
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Add a task to the queue, returning its generated id.
pub fn add_task(
    queue_dir: &Path,
    lock_manager: &LockManager,
    config: &Config,
    new_task: NewTask,
    dry_run: bool,
) -> anyhow::Result<String> {
    let id = format!("task-{}", &Uuid::new_v4().to_string()[..8]);
    let clock = SystemClock;
    let task_config = TaskConfig {
        id: id.clone(),
        task_type: new_task.task_type,
        priority: new_task.priority.unwrap_or(5),
        timeout_seconds: new_task.timeout_seconds.unwrap_or(config.task_default_timeout),
        max_retries: new_task.max_retries.unwrap_or(config.task_max_retries),
        command: new_task.command,
        tracker_number: new_task.tracker_number,
        ..Default::default()
    };
    let task = Task::new(task_config, &clock).map_err(|e| exit_error::validation(e.to_string()))?;

    if dry_run {
        return Ok(task.id);
    }

    let store = QueueStore::new(queue_dir);
    with_write_lock(lock_manager, "add_task", || -> anyhow::Result<()> {
        let mut doc = store.load()?;
        doc.tasks.push(task.clone());
        doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
        store.save(&doc, "add_task")?;
        Ok(())
    })??;

    Ok(id)
}

/// Render the queue as a human-readable listing.
pub fn list_queue(queue_dir: &Path) -> anyhow::Result<String> {
    let store = QueueStore::new(queue_dir);
    let doc = store.load()?;
    let mut out = String::new();
    if doc.paused {
        out.push_str("queue is paused\n");
    }
    if doc.tasks.is_empty() {
        out.push_str("queue is empty\n");
        return Ok(out);
    }
    for task in &doc.tasks {
        out.push_str(&format!(
            "{:<20} {:<12} priority={:<3} retries={}/{} {}\n",
            task.id, task.status, task.priority, task.retry_count, task.max_retries, task.command
        ));
    }
    Ok(out)
}

pub fn clear_queue(queue_dir: &Path, lock_manager: &LockManager, dry_run: bool) -> anyhow::Result<usize> {
    let store = QueueStore::new(queue_dir);
    let doc = store.load()?;
    let removed = doc.tasks.len();
    if dry_run || removed == 0 {
        return Ok(removed);
    }
    with_write_lock(lock_manager, "clear_queue", || -> anyhow::Result<()> {
        let mut doc = store.load()?;
        doc.tasks.clear();
        doc.refresh(&warden_core::time_fmt::iso8601(SystemClock.epoch_ms()));
        store.save(&doc, "clear_queue")?;
        Ok(())
    })??;
    Ok(removed)
}

pub fn set_paused(queue_dir: &Path, lock_manager: &LockManager, paused: bool, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        return Ok(());
    }
    let store = QueueStore::new(queue_dir);
    with_write_lock(lock_manager, "set_paused", || -> anyhow::Result<()> {
        let mut doc = store.load()?;
        doc.paused = paused;
        doc.refresh(&warden_core::time_fmt::iso8601(SystemClock.epoch_ms()));
        store.save(&doc, "set_paused")?;
        Ok(())
    })??;
    Ok(())
}

/// Fail the in-progress task (if any) without retrying it.
pub fn skip_current(queue_dir: &Path, lock_manager: &LockManager, dry_run: bool) -> anyhow::Result<Option<String>> {
    if dry_run {
        return Ok(None);
    }
    let store = QueueStore::new(queue_dir);
    let clock = SystemClock;
    with_write_lock(lock_manager, "skip_current", || -> anyhow::Result<Option<String>> {
        let mut doc = store.load()?;
        let Some(task) = doc
            .tasks
            .iter_mut()
            .find(|t| t.status == warden_core::task::TaskStatus::InProgress)
        else {
            return Ok(None);
        };
        let id = task.id.clone();
        task.transition(
            warden_core::task::TaskStatus::Failed,
            &clock,
            Some(("skipped by operator", None)),
        )?;
        doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
        store.save(&doc, "skip_current")?;
        Ok(Some(id))
    })?
}

/// Re-queue the in-progress task immediately, bypassing its retry budget.
pub fn retry_current(queue_dir: &Path, lock_manager: &LockManager, dry_run: bool) -> anyhow::Result<Option<String>> {
    if dry_run {
        return Ok(None);
    }
    let store = QueueStore::new(queue_dir);
    let clock = SystemClock;
    with_write_lock(lock_manager, "retry_current", || -> anyhow::Result<Option<String>> {
        let mut doc = store.load()?;
        let Some(task) = doc
            .tasks
            .iter_mut()
            .find(|t| t.status == warden_core::task::TaskStatus::InProgress)
        else {
            return Ok(None);
        };
        let id = task.id.clone();
        task.transition(warden_core::task::TaskStatus::Failed, &clock, None)?;
        task.retry(&clock)?;
        doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
        store.save(&doc, "retry_current")?;
        Ok(Some(id))
    })?
}
