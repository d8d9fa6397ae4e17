// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk schema for the canonical queue document (`task-queue.json`).

use crate::task::{Task, TaskStatus};
use serde::{Deserialize, Serialize};

/// Schema version written into every queue document.
pub const QUEUE_DOC_VERSION: &str = "1";

/// Per-status counters kept in the document header so readers don't need
/// to recompute them by scanning `tasks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounters {
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub timeout_tasks: usize,
}

impl QueueCounters {
    pub fn recompute(tasks: &[Task]) -> Self {
        let mut c = QueueCounters::default();
        c.total_tasks = tasks.len();
        for t in tasks {
            match t.status {
                TaskStatus::Pending => c.pending_tasks += 1,
                TaskStatus::InProgress => c.active_tasks += 1,
                TaskStatus::Completed => c.completed_tasks += 1,
                TaskStatus::Failed => c.failed_tasks += 1,
                TaskStatus::Timeout => c.timeout_tasks += 1,
            }
        }
        c
    }
}

/// The canonical document persisted at `queue/task-queue.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDocument {
    pub version: String,
    pub created: String,
    pub last_updated: String,
    #[serde(flatten)]
    pub counters: QueueCounters,
    /// `true` while the usage-limit waiter has the queue paused.
    #[serde(default)]
    pub paused: bool,
    pub tasks: Vec<Task>,
}

impl QueueDocument {
    pub fn new(created_at: &str) -> Self {
        Self {
            version: QUEUE_DOC_VERSION.to_string(),
            created: created_at.to_string(),
            last_updated: created_at.to_string(),
            counters: QueueCounters::default(),
            paused: false,
            tasks: Vec::new(),
        }
    }

    /// Recompute header counters from `tasks` and stamp `last_updated`.
    pub fn refresh(&mut self, now: &str) {
        self.counters = QueueCounters::recompute(&self.tasks);
        self.last_updated = now.to_string();
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Dispatch order: lowest `priority`, tie-broken by earliest
    /// `created_at`.
    pub fn next_pending(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            })
    }
}
