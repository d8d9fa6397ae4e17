// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work-item tracker adapter — interface only. No real
//! tracker integration ships in this crate; callers that queue
//! `tracker_issue`/`tracker_pr` tasks from a bare number resolve them
//! through this trait to get a title before the task is recorded.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use warden_core::task::TaskType;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker item not found: {0}")]
    NotFound(u64),
    #[error("tracker unavailable: {0}")]
    Unavailable(String),
}

/// A resolved work item: enough to give the queued task a human title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    pub number: u64,
    pub title: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait TrackerAdapter: Send + Sync {
    async fn resolve(&self, kind: TaskType, number: u64) -> Result<TrackedItem, TrackerError>;
}

/// Default adapter: no tracker is configured, so every lookup fails
/// closed and callers fall back to a generated placeholder title.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrackerAdapter;

impl NoopTrackerAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TrackerAdapter for NoopTrackerAdapter {
    async fn resolve(&self, _kind: TaskType, number: u64) -> Result<TrackedItem, TrackerError> {
        Err(TrackerError::NotFound(number))
    }
}

/// In-memory tracker for tests: seed it with items, then resolve.
#[derive(Clone, Default)]
pub struct FakeTrackerAdapter {
    items: Arc<Mutex<HashMap<u64, TrackedItem>>>,
}

impl FakeTrackerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, number: u64, title: &str) {
        self.items.lock().insert(
            number,
            TrackedItem {
                number,
                title: title.to_string(),
                url: None,
            },
        );
    }
}

#[async_trait]
impl TrackerAdapter for FakeTrackerAdapter {
    async fn resolve(&self, _kind: TaskType, number: u64) -> Result<TrackedItem, TrackerError> {
        self.items
            .lock()
            .get(&number)
            .cloned()
            .ok_or(TrackerError::NotFound(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_adapter_always_reports_not_found() {
        let adapter = NoopTrackerAdapter::new();
        let err = adapter.resolve(TaskType::TrackerIssue, 42).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(42)));
    }

    #[tokio::test]
    async fn fake_adapter_resolves_seeded_items() {
        let adapter = FakeTrackerAdapter::new();
        adapter.seed(7, "Fix the thing");
        let item = adapter.resolve(TaskType::TrackerIssue, 7).await.unwrap();
        assert_eq!(item.title, "Fix the thing");

        let err = adapter.resolve(TaskType::TrackerPr, 99).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(99)));
    }
}
