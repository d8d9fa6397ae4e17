// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error severity classification levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity assigned to a classified error message. The numeric
/// discriminants are fixed (`critical=3, warning=2, info=1, unknown=0`)
/// so ordering by `as u8` matches ordering by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Severity {
    Unknown = 0,
    Info = 1,
    Warning = 2,
    Critical = 3,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Unknown => "unknown",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

impl Severity {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
