// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed configuration. Loaded from an optional TOML
//! file, then overridden by CLI flags, then by a handful of
//! `WARDEN_`-prefixed environment variables — see `warden::config` in the
//! CLI crate for the merge order.

use serde::{Deserialize, Serialize};

/// All recognized configuration keys. Every field has a default so a
/// missing/partial TOML file is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    // --- Monitoring ---
    pub check_interval_minutes: u64,
    pub max_restarts: u32,
    pub health_check_enabled: bool,
    pub health_check_interval: u64,
    pub health_check_timeout: u64,
    pub auto_recovery_enabled: bool,
    pub recovery_delay: u64,
    pub max_recovery_attempts: u32,

    // --- Queue ---
    pub task_queue_enabled: bool,
    pub task_default_timeout: u64,
    pub task_max_retries: u32,
    pub task_retry_delay: u64,
    pub task_completion_pattern: String,
    pub queue_processing_delay: u64,
    /// Fixed at 1 by this spec; kept as a field so a document containing
    /// another value deserializes without error, but the engine refuses
    /// to honor anything else (see `Config::validate`).
    pub queue_max_concurrent: u32,
    pub queue_auto_pause_on_error: bool,
    pub queue_session_clear_between_tasks: bool,
    pub task_queue_max_size: usize,
    pub task_auto_cleanup_days: u32,
    pub task_backup_retention_days: u32,
    pub queue_lock_timeout: u64,

    // --- Usage limits ---
    pub usage_limit_cooldown: u64,
    pub backoff_factor: f64,
    pub max_wait_time: u64,
    pub usage_limit_threshold: u32,

    // --- Errors ---
    pub error_handling_enabled: bool,
    pub error_auto_recovery: bool,
    pub error_max_retries: u32,
    pub error_retry_delay: u64,
    pub error_escalation_threshold: u32,

    // --- Session lifecycle ---
    pub max_tracked_sessions: usize,
    pub stopped_session_cleanup_minutes: u64,
    pub error_session_cleanup_minutes: u64,

    // --- Ambient (not in the source spec's domain, required for a
    // complete crate) ---
    pub poll_interval_seconds: u64,
    pub progress_report_interval_seconds: u64,
    pub checkpoint_retention_days: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval_minutes: 5,
            max_restarts: 5,
            health_check_enabled: true,
            health_check_interval: 60,
            health_check_timeout: 30,
            auto_recovery_enabled: true,
            recovery_delay: 30,
            max_recovery_attempts: 3,

            task_queue_enabled: true,
            task_default_timeout: 3600,
            task_max_retries: 3,
            task_retry_delay: 60,
            task_completion_pattern: "###TASK_COMPLETE###".to_string(),
            queue_processing_delay: 5,
            queue_max_concurrent: 1,
            queue_auto_pause_on_error: true,
            queue_session_clear_between_tasks: false,
            task_queue_max_size: 1000,
            task_auto_cleanup_days: 30,
            task_backup_retention_days: 30,
            queue_lock_timeout: 30,

            usage_limit_cooldown: 300,
            backoff_factor: 1.5,
            max_wait_time: 1800,
            usage_limit_threshold: 3,

            error_handling_enabled: true,
            error_auto_recovery: true,
            error_max_retries: 3,
            error_retry_delay: 60,
            error_escalation_threshold: 3,

            max_tracked_sessions: 100,
            stopped_session_cleanup_minutes: 30,
            error_session_cleanup_minutes: 15,

            poll_interval_seconds: 10,
            progress_report_interval_seconds: 60,
            checkpoint_retention_days: 7,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse from a TOML document, falling back to defaults for any
    /// missing key.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// `queue_max_concurrent` is pinned to 1 regardless of what was
    /// configured.
    pub fn effective_max_concurrent(&self) -> u32 {
        1
    }
}
