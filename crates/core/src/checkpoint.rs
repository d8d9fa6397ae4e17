// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task checkpoint records.
//!
//! A checkpoint is a point-in-time snapshot of a task's progress,
//! written to `queue/checkpoints/<task_id>-<epoch>-<reason>.json` so a
//! later `--retry-current` or crash-recovery pass can resume instead of
//! starting the command over.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a checkpoint was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    Periodic,
    BeforeRecovery,
    UsageLimit,
    Manual,
    Shutdown,
}

impl fmt::Display for CheckpointReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckpointReason::Periodic => "periodic",
            CheckpointReason::BeforeRecovery => "before_recovery",
            CheckpointReason::UsageLimit => "usage_limit",
            CheckpointReason::Manual => "manual",
            CheckpointReason::Shutdown => "shutdown",
        };
        write!(f, "{}", s)
    }
}

/// A single checkpoint for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub task_id: String,
    pub reason: CheckpointReason,
    /// Epoch seconds the checkpoint was taken, also embedded in the
    /// checkpoint's filename so listings sort chronologically.
    pub epoch: u64,
    pub created_at: String,
    /// Free-form progress description captured from the session output,
    /// if any was available at checkpoint time.
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl Checkpoint {
    pub fn new(
        task_id: impl Into<String>,
        reason: CheckpointReason,
        epoch: u64,
        created_at: impl Into<String>,
        retry_count: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            reason,
            epoch,
            created_at: created_at.into(),
            note: None,
            retry_count,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Filename this checkpoint is written under.
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.json", self.task_id, self.epoch, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_matches_spec_pattern() {
        let cp = Checkpoint::new("task-7", CheckpointReason::UsageLimit, 1000, "t0", 2);
        assert_eq!(cp.file_name(), "task-7-1000-usage_limit.json");
    }

    #[test]
    fn with_note_sets_optional_field() {
        let cp = Checkpoint::new("task-7", CheckpointReason::Manual, 1000, "t0", 0)
            .with_note("halfway through migration");
        assert_eq!(cp.note.as_deref(), Some("halfway through migration"));
    }
}
