// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detects usage-limit messages in captured session output and computes
//! how long to pause before resuming.

use regex::Regex;
use std::sync::LazyLock;

/// 30s cushion added to a time-anchored wait so we don't wake up a few
/// seconds before the limit actually lifts.
const TIME_ANCHOR_BUFFER_SECS: u64 = 30;

const MIN_WAIT_SECS: u64 = 60;

static TIME_ANCHORED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(blocked until|try again at|available again at|wait until|retry at|available at)\s+(\d{1,2}):(\d{2})\s*(am|pm)?",
    )
    .expect("constant regex pattern is valid")
});

const GENERIC_PATTERNS: &[&str] = &[
    "usage limit",
    "rate limit",
    "too many requests",
    "please try again later",
    "request limit exceeded",
    "quota exceeded",
    "temporarily unavailable",
    "service temporarily overloaded",
    "daily usage limit",
    "hourly rate limit",
    "api quota exceeded",
];

/// A detected usage-limit signal in captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageLimitMatch {
    /// A specific resume time was stated; `wait_seconds` is already
    /// clamped and buffered.
    TimeAnchored { pattern: String, wait_seconds: u64 },
    /// A generic limit phrase with no resume time; the caller must
    /// compute a backoff wait (see `UsageLimitWaiter`).
    Generic { pattern: String },
}

/// Scan `text` for a usage-limit signal. Time-anchored patterns take
/// precedence over generic ones. `now_epoch_secs` is used to resolve
/// "HH:MM" against the current wall-clock day; `max_wait_seconds` clamps
/// the time-anchored result (generic matches are clamped by the caller).
pub fn parse_usage_limit(text: &str, now_epoch_secs: u64, max_wait_seconds: u64) -> Option<UsageLimitMatch> {
    if let Some(caps) = TIME_ANCHORED_RE.captures(text) {
        let phrase = caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
        let hour: u32 = caps[2].parse().ok()?;
        let minute: u32 = caps[3].parse().ok()?;
        let meridiem = caps.get(4).map(|m| m.as_str().to_ascii_lowercase());

        let hour24 = to_24h(hour, meridiem.as_deref())?;
        let wait = wait_until(hour24, minute, now_epoch_secs);
        let wait = wait.saturating_add(TIME_ANCHOR_BUFFER_SECS);
        let wait = wait.clamp(MIN_WAIT_SECS, max_wait_seconds);

        return Some(UsageLimitMatch::TimeAnchored {
            pattern: phrase,
            wait_seconds: wait,
        });
    }

    let lowered = text.to_lowercase();
    for pattern in GENERIC_PATTERNS {
        if lowered.contains(pattern) {
            return Some(UsageLimitMatch::Generic {
                pattern: (*pattern).to_string(),
            });
        }
    }

    None
}

/// Convert a 12-hour `(hour, meridiem)` pair (or an already-24h hour with
/// no meridiem) to 24-hour form.
fn to_24h(hour: u32, meridiem: Option<&str>) -> Option<u32> {
    match meridiem {
        Some("am") => Some(if hour == 12 { 0 } else { hour }),
        Some("pm") => Some(if hour == 12 { 12 } else { hour + 12 }),
        _ => {
            if hour < 24 {
                Some(hour)
            } else {
                None
            }
        }
    }
}

/// Seconds from `now` until the next occurrence of `target_hour:target_minute`,
/// today if it's still ahead, otherwise tomorrow.
fn wait_until(target_hour: u32, target_minute: u32, now_epoch_secs: u64) -> u64 {
    const DAY_SECS: u64 = 86_400;
    let day_secs = now_epoch_secs % DAY_SECS;
    let target_secs = u64::from(target_hour) * 3600 + u64::from(target_minute) * 60;

    if target_secs > day_secs {
        target_secs - day_secs
    } else {
        (DAY_SECS - day_secs) + target_secs
    }
}

/// Tracks usage-limit occurrences to compute the exponential backoff wait
/// for generic (non-time-anchored) matches.
pub struct UsageLimitWaiter {
    base_cooldown_secs: u64,
    factor: f64,
    max_wait_seconds: u64,
    occurrence_count: u32,
}

impl UsageLimitWaiter {
    pub fn new(base_cooldown_secs: u64, factor: f64, max_wait_seconds: u64) -> Self {
        Self {
            base_cooldown_secs,
            factor,
            max_wait_seconds,
            occurrence_count: 0,
        }
    }

    pub fn occurrence_count(&self) -> u32 {
        self.occurrence_count
    }

    pub fn reset(&mut self) {
        self.occurrence_count = 0;
    }

    /// Record one more occurrence and compute the wait for a generic
    /// match: `base_cooldown * factor^(occurrences - 1)`, clamped.
    pub fn next_backoff_wait(&mut self) -> u64 {
        self.occurrence_count += 1;
        let exponent = (self.occurrence_count - 1) as i32;
        let wait = self.base_cooldown_secs as f64 * self.factor.powi(exponent);
        (wait.round() as u64).clamp(MIN_WAIT_SECS, self.max_wait_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_time_anchored_pattern_case_insensitively() {
        // now = 2024-01-01T10:00:00Z -> day_secs = 36000
        let now = 1_704_103_200;
        let m = parse_usage_limit("You are BLOCKED UNTIL 11:00am, please wait", now, 1800).unwrap();
        match m {
            UsageLimitMatch::TimeAnchored { wait_seconds, .. } => {
                // 11:00 - 10:00 = 3600s + 30s buffer = 3630, clamped to max 1800
                assert_eq!(wait_seconds, 1800);
            }
            _ => panic!("expected time-anchored match"),
        }
    }

    #[test]
    fn time_anchored_wraps_to_next_day_when_target_already_passed() {
        // now = day_secs 36000 (10:00:00), target 09:00 already passed today
        let now = 1_704_103_200;
        let m = parse_usage_limit("try again at 09:00", now, 1800).unwrap();
        match m {
            UsageLimitMatch::TimeAnchored { wait_seconds, .. } => {
                // (86400 - 36000) + 32400 = 50400 + 30 buffer, clamped to 1800
                assert_eq!(wait_seconds, 1800);
            }
            _ => panic!("expected time-anchored match"),
        }
    }

    #[test]
    fn time_anchored_takes_precedence_over_generic() {
        let now = 0;
        let m = parse_usage_limit("usage limit reached, try again at 00:05", now, 1800).unwrap();
        assert!(matches!(m, UsageLimitMatch::TimeAnchored { .. }));
    }

    #[test]
    fn detects_generic_pattern_when_no_time_present() {
        let m = parse_usage_limit("Error: rate limit exceeded for this account", 0, 1800).unwrap();
        match m {
            UsageLimitMatch::Generic { pattern } => assert_eq!(pattern, "rate limit"),
            _ => panic!("expected generic match"),
        }
    }

    #[test]
    fn no_match_for_unrelated_text() {
        assert!(parse_usage_limit("compilation succeeded", 0, 1800).is_none());
    }

    #[test]
    fn backoff_waiter_applies_exponential_growth_and_clamps() {
        let mut waiter = UsageLimitWaiter::new(300, 1.5, 1800);
        assert_eq!(waiter.next_backoff_wait(), 300);
        assert_eq!(waiter.next_backoff_wait(), 450);
        assert_eq!(waiter.next_backoff_wait(), 675);
        for _ in 0..10 {
            waiter.next_backoff_wait();
        }
        assert_eq!(waiter.next_backoff_wait(), 1800);
    }

    #[test]
    fn backoff_waiter_resets() {
        let mut waiter = UsageLimitWaiter::new(300, 1.5, 1800);
        waiter.next_backoff_wait();
        waiter.next_backoff_wait();
        waiter.reset();
        assert_eq!(waiter.occurrence_count(), 0);
        assert_eq!(waiter.next_backoff_wait(), 300);
    }
}
