// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed lock vocabulary. The actual `mkdir`-based
//! acquisition lives in `warden-storage::lock` — this module only
//! defines the conflict matrix and on-disk metadata shape, since both
//! the storage crate and the CLI's `status` output need them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Purpose-scoped lock type. Conflicts are defined in
/// [`LockType::conflicts_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Single-task mutation (add/remove/update_status/update_priority).
    Write,
    /// Batch/import operations.
    Batch,
    /// Configuration changes.
    Config,
    /// Cleanup/repair (stale-lock sweep, backup retention).
    Maintenance,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockType::Write => "write",
            LockType::Batch => "batch",
            LockType::Config => "config",
            LockType::Maintenance => "maintenance",
        };
        write!(f, "{}", s)
    }
}

impl LockType {
    /// Whether a holder of `self` blocks a request for `other`.
    ///
    /// `maintenance` conflicts with everything (including itself); `write`
    /// and `batch` conflict with each other and themselves but not with
    /// `config`; `config` only conflicts with `maintenance` and itself.
    pub fn conflicts_with(self, other: LockType) -> bool {
        use LockType::*;
        if self == Maintenance || other == Maintenance {
            return true;
        }
        if self == other {
            return true;
        }
        matches!((self, other), (Write, Batch) | (Batch, Write))
    }
}

/// Contents of the metadata files written inside a lock directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    pub pid: u32,
    pub timestamp: String,
    pub hostname: String,
    pub user: String,
    pub operation: String,
    pub lock_type: LockType,
}
