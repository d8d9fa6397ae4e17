// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk marker describing an active usage-limit pause.

use serde::{Deserialize, Serialize};

/// Persisted while the monitor loop is sleeping through a detected usage
/// limit. Lets a concurrently-running `status`/`monitor` process report
/// the same pause without re-deriving it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseMarker {
    /// ISO-8601 timestamp the pause was entered.
    pub pause_time: String,
    pub estimated_wait_seconds: u64,
    /// ISO-8601 timestamp the pause is expected to end.
    pub estimated_resume_time: String,
    pub current_task_id: Option<String>,
    /// The raw substring that triggered detection, kept for diagnostics.
    pub detected_pattern: String,
    /// Number of consecutive usage-limit detections for this task, used
    /// by the generic backoff formula.
    pub occurrence_count: u32,
}

impl PauseMarker {
    pub fn new(
        pause_time: String,
        estimated_wait_seconds: u64,
        estimated_resume_time: String,
        current_task_id: Option<String>,
        detected_pattern: String,
        occurrence_count: u32,
    ) -> Self {
        Self {
            pause_time,
            estimated_wait_seconds,
            estimated_resume_time,
            current_task_id,
            detected_pattern,
            occurrence_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let marker = PauseMarker::new(
            "2026-08-01T00:00:00Z".into(),
            3600,
            "2026-08-01T01:00:00Z".into(),
            Some("task-1".into()),
            "try again at 5pm".into(),
            1,
        );
        let json = serde_json::to_string(&marker).unwrap();
        let back: PauseMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(back.occurrence_count, 1);
        assert_eq!(back.current_task_id.as_deref(), Some("task-1"));
    }
}
