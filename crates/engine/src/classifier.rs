// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classifies error text into a severity and records classification
//! history.

use std::collections::HashMap;
use warden_core::severity::Severity;

const CRITICAL_PATTERNS: &[&str] = &[
    "segmentation fault",
    "segfault",
    "core dumped",
    "out of memory",
    "no space left on device",
    "disk full",
    "permission denied",
    "access denied",
    "authentication failed",
    "unauthorized",
    "fatal error",
    "panic",
    "emergency",
    "corruption",
    "kernel panic",
    "system halt",
];

const WARNING_PATTERNS: &[&str] = &[
    "network timeout",
    "connection timeout",
    "connection refused",
    "connection reset",
    "connection lost",
    "rate limit",
    "limit exceeded",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "dns",
    "could not resolve",
    "name resolution",
    "host unreachable",
    "no route to host",
    "disconnected",
    "interrupted",
];

const INFO_PATTERNS: &[&str] = &[
    "command not found",
    "file not found",
    "directory not found",
    "no such file",
    "syntax error",
    "parse error",
    "format error",
    "validation error",
    "config error",
    "configuration error",
    "missing parameter",
    "unexpected token",
    "malformed",
];

/// A classified error, ready to be handed to the recovery engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub severity: Severity,
    pub matched_pattern: Option<String>,
    pub fingerprint: String,
}

/// Normalize the first 100 characters of `message` to alphanumeric and
/// underscore, for use as a stable classification-history key.
fn fingerprint(message: &str) -> String {
    message
        .chars()
        .take(100)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn first_match(lowered: &str, patterns: &[&str]) -> Option<String> {
    patterns
        .iter()
        .find(|p| lowered.contains(**p))
        .map(|p| (*p).to_string())
}

/// Classify `message` (severity order: critical, warning, info; else
/// unknown). `context`/`task_id` are accepted for parity with the
/// documented input shape but do not affect the matched severity.
pub fn classify(message: &str, _context: Option<&str>, _task_id: Option<&str>) -> ClassifiedError {
    let lowered = message.to_lowercase();

    let (severity, matched_pattern) = if let Some(p) = first_match(&lowered, CRITICAL_PATTERNS) {
        (Severity::Critical, Some(p))
    } else if let Some(p) = first_match(&lowered, WARNING_PATTERNS) {
        (Severity::Warning, Some(p))
    } else if let Some(p) = first_match(&lowered, INFO_PATTERNS) {
        (Severity::Info, Some(p))
    } else {
        (Severity::Unknown, None)
    };

    ClassifiedError {
        severity,
        matched_pattern,
        fingerprint: fingerprint(message),
    }
}

/// Records classification occurrences: a history
/// map keyed by `<epoch>_<fingerprint>` and a counter keyed by
/// `<severity>_<fingerprint>`.
#[derive(Debug, Default)]
pub struct ErrorClassifier {
    history: HashMap<String, ClassifiedError>,
    counters: HashMap<String, u32>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `message` and record it against `now_epoch_secs`.
    pub fn classify_and_record(
        &mut self,
        message: &str,
        context: Option<&str>,
        task_id: Option<&str>,
        now_epoch_secs: u64,
    ) -> ClassifiedError {
        let classified = classify(message, context, task_id);

        let history_key = format!("{now_epoch_secs}_{}", classified.fingerprint);
        self.history.insert(history_key, classified.clone());

        let counter_key = format!("{}_{}", classified.severity, classified.fingerprint);
        *self.counters.entry(counter_key).or_insert(0) += 1;

        classified
    }

    pub fn occurrence_count(&self, severity: Severity, fingerprint: &str) -> u32 {
        let key = format!("{severity}_{fingerprint}");
        self.counters.get(&key).copied().unwrap_or(0)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
