// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so the queue, locks, and usage-limit math stay testable
//! without sleeping or depending on wall-clock `SystemTime::now()` directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current time. Implementations must be cheap to call —
/// the monitor loop and lock manager call it on every iteration.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;

    /// Seconds since the Unix epoch.
    fn epoch_secs(&self) -> u64 {
        self.epoch_ms() / 1000
    }
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Controllable clock for deterministic tests (lock staleness, usage-limit
/// wait math, retry timing).
#[derive(Debug, Default)]
pub struct FakeClock {
    epoch_ms: AtomicU64,
}

impl FakeClock {
    pub fn new(epoch_ms: u64) -> Self {
        Self {
            epoch_ms: AtomicU64::new(epoch_ms),
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        self.epoch_ms.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_epoch_ms(&self, value: u64) {
        self.epoch_ms.store(value, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }
}
