// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier and state machine.
//!
//! A `Task` is the atomic unit of work dispatched into an assistant
//! session. Its lifecycle is a small state machine enforced entirely in
//! this module so the queue store cannot persist an invalid transition.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a task instance.
    #[derive(Default)]
    pub struct TaskId;
}

/// Default per-task timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 3600;
/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default dispatch verb for tracker-derived commands (`/<verb> <number>`).
pub const DEFAULT_TRACKER_VERB: &str = "dev";
/// Maximum length of a task id.
pub const MAX_TASK_ID_LEN: usize = 100;

/// The kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    TrackerIssue,
    TrackerPr,
    Custom,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::TrackerIssue => write!(f, "tracker_issue"),
            TaskType::TrackerPr => write!(f, "tracker_pr"),
            TaskType::Custom => write!(f, "custom"),
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Timeout,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Timeout => write!(f, "timeout"),
        }
    }
}

impl TaskStatus {
    /// Whether `self -> next` is an allowed transition.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Failed)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Timeout)
                | (Failed, Pending)
                | (Timeout, Pending)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// Errors raised by task construction and state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("invalid task id {0:?}: must match [A-Za-z0-9_-]+ and be <= {MAX_TASK_ID_LEN} chars")]
    InvalidId(String),
    #[error("invalid priority {0}: must be in 1..=10")]
    InvalidPriority(i32),
    #[error("invalid timeout_seconds {0}: must be >= 1")]
    InvalidTimeout(u64),
    #[error("custom tasks require an explicit command")]
    MissingCommand,
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

/// Input needed to construct a new [`Task`].
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub id: String,
    pub task_type: TaskType,
    pub priority: i32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// Required for `Custom`, ignored otherwise.
    pub command: Option<String>,
    pub description: Option<String>,
    pub tracker_number: Option<u64>,
    pub title: Option<String>,
    pub labels: Vec<String>,
    /// Dispatch verb for tracker-derived commands (default `"dev"`).
    pub tracker_verb: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            task_type: TaskType::Custom,
            priority: 5,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            command: None,
            description: None,
            tracker_number: None,
            title: None,
            labels: Vec::new(),
            tracker_verb: DEFAULT_TRACKER_VERB.to_string(),
        }
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_TASK_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A unit of work tracked by the queue store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: i32,
    pub status: TaskStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_at: Option<String>,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry_count: u32,
    pub max_retries: u32,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<String>,
    /// Forward-compatible bag for metadata keys this version doesn't know about.
    #[serde(default, flatten)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Task {
    /// Construct a new, validated, `Pending` task.
    pub fn new(config: TaskConfig, clock: &impl Clock) -> Result<Self, TaskError> {
        if !is_valid_id(&config.id) {
            return Err(TaskError::InvalidId(config.id));
        }
        if !(1..=10).contains(&config.priority) {
            return Err(TaskError::InvalidPriority(config.priority));
        }
        if config.timeout_seconds == 0 {
            return Err(TaskError::InvalidTimeout(config.timeout_seconds));
        }

        let command = match config.task_type {
            TaskType::Custom => config.command.clone().ok_or(TaskError::MissingCommand)?,
            TaskType::TrackerIssue | TaskType::TrackerPr => {
                let number = config.tracker_number.unwrap_or_default();
                format!("/{} {}", config.tracker_verb, number)
            }
        };

        let now = crate::time_fmt::iso8601(clock.epoch_ms());

        Ok(Self {
            id: config.id,
            task_type: config.task_type,
            priority: config.priority,
            status: TaskStatus::Pending,
            created_at: now.clone(),
            updated_at: Some(now),
            in_progress_at: None,
            completed_at: None,
            failed_at: None,
            timeout_at: None,
            timeout_seconds: config.timeout_seconds,
            retry_count: 0,
            max_retries: config.max_retries,
            command,
            tracker_number: config.tracker_number,
            title: config.title,
            labels: config.labels,
            description: config.description,
            last_error_message: None,
            last_error_code: None,
            last_error_at: None,
            metadata: HashMap::new(),
        })
    }

    /// Apply a validated status transition, stamping the matching
    /// `<status>_at` field and bumping `updated_at`.
    ///
    /// `failed` and `timeout` transitions bump `retry_count` only when
    /// re-entering `pending` afterwards via [`Task::retry`] — this method
    /// never mutates `retry_count` itself.
    pub fn transition(
        &mut self,
        new_status: TaskStatus,
        clock: &impl Clock,
        error_detail: Option<(&str, Option<&str>)>,
    ) -> Result<(), TaskError> {
        if !self.status.can_transition_to(new_status) {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }
        let now = crate::time_fmt::iso8601(clock.epoch_ms());
        match new_status {
            TaskStatus::InProgress => self.in_progress_at = Some(now.clone()),
            TaskStatus::Completed => self.completed_at = Some(now.clone()),
            TaskStatus::Failed => self.failed_at = Some(now.clone()),
            TaskStatus::Timeout => self.timeout_at = Some(now.clone()),
            TaskStatus::Pending => {}
        }
        if let Some((message, code)) = error_detail {
            self.last_error_message = Some(message.to_string());
            self.last_error_code = code.map(str::to_string);
            self.last_error_at = Some(now.clone());
        }
        self.status = new_status;
        self.updated_at = Some(now);
        Ok(())
    }

    /// Whether this task can be retried right now.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(self.status, TaskStatus::Failed | TaskStatus::Timeout)
            && self.retry_count < self.max_retries
    }

    /// Move a failed/timed-out task back to `pending`, incrementing
    /// `retry_count`. Fails with `InvalidTransition` if not retry-eligible
    /// by state, independent of the `retry_count` budget check (callers
    /// should check [`Task::is_retry_eligible`] first for budget).
    pub fn retry(&mut self, clock: &impl Clock) -> Result<(), TaskError> {
        self.transition(TaskStatus::Pending, clock, None)?;
        self.retry_count += 1;
        Ok(())
    }
}
