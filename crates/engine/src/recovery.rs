// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes the strategy `warden_core::recovery::RecoveryStrategy::select`
//! picks. Pure decision logic: the caller (monitor loop)
//! applies the returned outcome against the queue store, checkpoint
//! store, and session adapter.

use std::collections::HashMap;
use warden_core::checkpoint::CheckpointReason;
use warden_core::recovery::RecoveryStrategy;
use warden_core::severity::Severity;

/// A human-readable recovery report for `manual_recovery`.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    pub task_id: String,
    pub severity: Severity,
    pub error_history: Vec<String>,
    pub recommended_actions: Vec<String>,
}

/// What the caller must do to carry out a chosen strategy.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub strategy: RecoveryStrategy,
    pub checkpoint_reason: Option<CheckpointReason>,
    /// Fail the task with this reason string instead of retrying it.
    pub fail_with_reason: Option<String>,
    /// Sleep this long before retrying (`simple_retry`).
    pub retry_delay_secs: Option<u64>,
    /// Replace the task's timeout with this value before rescheduling
    /// (`timeout_recovery`), doubled and capped by the engine.
    pub new_timeout_seconds: Option<u64>,
    pub report: Option<RecoveryReport>,
    pub pause_queue: bool,
    pub exit_process: bool,
    /// Recover the session itself (checkpoint, restart the adapter
    /// session, resend the task) before deciding the task's fate
    /// (`automatic_recovery`).
    pub attempt_session_recovery: bool,
}

impl RecoveryOutcome {
    fn simple(strategy: RecoveryStrategy) -> Self {
        Self {
            strategy,
            checkpoint_reason: None,
            fail_with_reason: None,
            retry_delay_secs: None,
            new_timeout_seconds: None,
            report: None,
            pause_queue: false,
            exit_process: false,
            attempt_session_recovery: false,
        }
    }
}

const TIMEOUT_RECOVERY_CAP_SECONDS: u64 = 6 * 3600;

/// Executes recovery strategies and tracks a per-`(task_id, strategy)`
/// attempt counter.
#[derive(Debug, Default)]
pub struct RecoveryEngine {
    attempts: HashMap<(String, RecoveryStrategy), u32>,
}

impl RecoveryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_count(&self, task_id: &str, strategy: RecoveryStrategy) -> u32 {
        self.attempts.get(&(task_id.to_string(), strategy)).copied().unwrap_or(0)
    }

    /// Select and execute a strategy for `task_id` given its severity and
    /// retry state.
    pub fn recover(
        &mut self,
        task_id: &str,
        severity: Severity,
        retry_count: u32,
        max_retries: u32,
        auto_recovery_enabled: bool,
        retry_delay_secs: u64,
        error_history: Vec<String>,
    ) -> RecoveryOutcome {
        let strategy = RecoveryStrategy::select(severity, retry_count, max_retries, auto_recovery_enabled);
        *self.attempts.entry((task_id.to_string(), strategy)).or_insert(0) += 1;

        match strategy {
            RecoveryStrategy::EmergencyShutdown => {
                let mut outcome = RecoveryOutcome::simple(strategy);
                outcome.checkpoint_reason = None;
                outcome.pause_queue = true;
                outcome.exit_process = true;
                outcome
            }
            RecoveryStrategy::AutomaticRecovery => {
                let mut outcome = RecoveryOutcome::simple(strategy);
                outcome.checkpoint_reason = Some(CheckpointReason::BeforeRecovery);
                outcome.attempt_session_recovery = true;
                outcome
            }
            RecoveryStrategy::ManualRecovery => {
                let mut outcome = RecoveryOutcome::simple(strategy);
                outcome.fail_with_reason = Some("manual_recovery_required".to_string());
                outcome.report = Some(RecoveryReport {
                    task_id: task_id.to_string(),
                    severity,
                    error_history,
                    recommended_actions: vec![
                        "review the session output for the root cause".to_string(),
                        "resolve the underlying issue before retrying".to_string(),
                        "use --retry-current once resolved".to_string(),
                    ],
                });
                outcome
            }
            RecoveryStrategy::SimpleRetry => {
                let mut outcome = RecoveryOutcome::simple(strategy);
                outcome.retry_delay_secs = Some(retry_delay_secs);
                outcome
            }
            RecoveryStrategy::SafeRecovery => {
                let mut outcome = RecoveryOutcome::simple(strategy);
                outcome.checkpoint_reason = Some(CheckpointReason::BeforeRecovery);
                outcome.fail_with_reason = Some("safe_mode_fallback".to_string());
                outcome
            }
            RecoveryStrategy::TimeoutRecovery => {
                unreachable!("timeout_recovery is invoked directly via recover_timeout")
            }
        }
    }

    /// Invoked directly by the monitor loop when a completion poll
    /// exceeds the task timeout.
    pub fn recover_timeout(&mut self, task_id: &str, current_timeout_seconds: u64, fallback_retry_delay_secs: u64) -> RecoveryOutcome {
        *self
            .attempts
            .entry((task_id.to_string(), RecoveryStrategy::TimeoutRecovery))
            .or_insert(0) += 1;

        let doubled = current_timeout_seconds.saturating_mul(2).min(TIMEOUT_RECOVERY_CAP_SECONDS);
        if doubled > current_timeout_seconds {
            let mut outcome = RecoveryOutcome::simple(RecoveryStrategy::TimeoutRecovery);
            outcome.checkpoint_reason = Some(CheckpointReason::BeforeRecovery);
            outcome.new_timeout_seconds = Some(doubled);
            outcome
        } else {
            // Already at the cap — fall back to a simple retry.
            let mut outcome = RecoveryOutcome::simple(RecoveryStrategy::SimpleRetry);
            outcome.retry_delay_secs = Some(fallback_retry_delay_secs);
            outcome
        }
    }
}
