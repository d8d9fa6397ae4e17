// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery strategies selected by the recovery engine.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The action the recovery engine takes for a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    EmergencyShutdown,
    AutomaticRecovery,
    ManualRecovery,
    SimpleRetry,
    SafeRecovery,
    TimeoutRecovery,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryStrategy::EmergencyShutdown => "emergency_shutdown",
            RecoveryStrategy::AutomaticRecovery => "automatic_recovery",
            RecoveryStrategy::ManualRecovery => "manual_recovery",
            RecoveryStrategy::SimpleRetry => "simple_retry",
            RecoveryStrategy::SafeRecovery => "safe_recovery",
            RecoveryStrategy::TimeoutRecovery => "timeout_recovery",
        };
        write!(f, "{}", s)
    }
}

impl RecoveryStrategy {
    /// Picks a recovery strategy from severity and retry budget.
    /// `retry_count`/`max_retries` come from the task;
    /// `auto_recovery_enabled` is a config flag.
    pub fn select(
        severity: Severity,
        retry_count: u32,
        max_retries: u32,
        auto_recovery_enabled: bool,
    ) -> Self {
        let retries_remaining = retry_count < max_retries;
        match severity {
            Severity::Critical => RecoveryStrategy::EmergencyShutdown,
            Severity::Warning => {
                if retries_remaining && auto_recovery_enabled {
                    RecoveryStrategy::AutomaticRecovery
                } else {
                    RecoveryStrategy::ManualRecovery
                }
            }
            Severity::Info => {
                if retries_remaining {
                    RecoveryStrategy::SimpleRetry
                } else {
                    RecoveryStrategy::SafeRecovery
                }
            }
            Severity::Unknown => RecoveryStrategy::SafeRecovery,
        }
    }
}
