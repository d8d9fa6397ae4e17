// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mkdir`-based typed locks over the queue directory.
//!
//! A lock is a directory (`.<type>.lock.d`) created with a create-if-
//! not-exists primitive; its existence *is* the lock. Holder metadata is
//! written inside as plain files so a competing process (or an operator)
//! can diagnose a stuck lock without parsing anything exotic.

use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};
use warden_core::LockType;

const STALE_AGE: Duration = Duration::from_secs(10 * 60);
const BASE_BACKOFF: Duration = Duration::from_millis(100);
const BACKOFF_FACTOR: f64 = 1.5;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("lock_timeout: could not acquire {lock_type} lock for {operation} after {attempts} attempts (holder pid={holder_pid:?}, age_secs={age_secs:?})")]
    Timeout {
        lock_type: LockType,
        operation: String,
        attempts: u32,
        holder_pid: Option<u32>,
        age_secs: Option<u64>,
    },
    #[error("not_owner: pid {actual} does not own this lock (held by {expected})")]
    NotOwner { expected: u32, actual: u32 },
}

/// How many attempts to budget for a given operation class before giving
/// up: quick ops get roughly 5, heavy ops roughly 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptBudget {
    Quick,
    Heavy,
}

impl AttemptBudget {
    fn max_attempts(self) -> u32 {
        match self {
            AttemptBudget::Quick => 5,
            AttemptBudget::Heavy => 15,
        }
    }
}

/// Caps the exponential backoff ceiling; the CLI runs short-lived so it
/// waits less eagerly than the continuous daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffMode {
    Cli,
    Daemon,
}

impl BackoffMode {
    fn cap(self) -> Duration {
        match self {
            BackoffMode::Cli => Duration::from_secs(2),
            BackoffMode::Daemon => Duration::from_secs(5),
        }
    }
}

/// A held lock; releasing is `release()`, or automatic on drop via
/// [`LockGuard`].
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub lock_type: LockType,
    pub pid: u32,
    dir: PathBuf,
}

/// Snapshot of a lock directory's contents, used for diagnostics and
/// `status()`.
#[derive(Debug, Clone)]
pub struct LockStatus {
    pub lock_type: LockType,
    pub pid: u32,
    pub timestamp: String,
    pub hostname: String,
    pub user: String,
    pub operation: String,
    pub age_secs: u64,
    pub stale: bool,
}

/// Manages typed locks rooted at a queue directory.
pub struct LockManager {
    root: PathBuf,
    backoff_mode: BackoffMode,
}

impl LockManager {
    pub fn new(root: impl Into<PathBuf>, backoff_mode: BackoffMode) -> Self {
        Self {
            root: root.into(),
            backoff_mode,
        }
    }

    fn lock_dir(&self, lock_type: LockType) -> PathBuf {
        self.root.join(format!(".{}.lock.d", lock_type))
    }

    /// Acquire a typed lock for `operation`, retrying through contention
    /// and cleaning up stale holders along the way. Also waits out any
    /// *conflicting* lock type per [`LockType::conflicts_with`] — e.g. a
    /// `write` request blocks while a `maintenance` lock is held, even
    /// though they occupy distinct directories.
    pub fn acquire(
        &self,
        lock_type: LockType,
        operation: &str,
        budget: AttemptBudget,
    ) -> Result<LockHandle, LockError> {
        let dir = self.lock_dir(lock_type);
        let max_attempts = budget.max_attempts();
        let mut backoff = BASE_BACKOFF;
        let mut last_status: Option<LockStatus> = None;

        for attempt in 0..max_attempts {
            if let Some(status) = self.conflicting_holder(lock_type) {
                if status.stale {
                    let conflict_dir = self.lock_dir(status.lock_type);
                    debug!(pid = status.pid, age = status.age_secs, lock_type = %status.lock_type, "removing stale conflicting lock");
                    let _ = fs::remove_dir_all(&conflict_dir);
                } else {
                    last_status = Some(status);
                    if attempt + 1 == max_attempts {
                        break;
                    }
                    thread::sleep(jittered(backoff, self.backoff_mode.cap()));
                    backoff = backoff.mul_f64(BACKOFF_FACTOR).min(self.backoff_mode.cap());
                    continue;
                }
            }

            match self.try_create(&dir, lock_type, operation) {
                Ok(()) => {
                    return Ok(LockHandle {
                        lock_type,
                        pid: std::process::id(),
                        dir,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if let Some(status) = self.read_status(&dir, lock_type) {
                        if status.stale {
                            debug!(pid = status.pid, age = status.age_secs, "removing stale lock");
                            let _ = fs::remove_dir_all(&dir);
                            last_status = Some(status);
                            continue;
                        }
                        last_status = Some(status);
                    } else {
                        // Directory exists but metadata unreadable: treat as stale.
                        let _ = fs::remove_dir_all(&dir);
                        continue;
                    }
                }
                Err(e) => return Err(e.into()),
            }

            if attempt + 1 == max_attempts {
                break;
            }
            thread::sleep(jittered(backoff, self.backoff_mode.cap()));
            backoff = backoff.mul_f64(BACKOFF_FACTOR).min(self.backoff_mode.cap());
        }

        warn!(
            lock_type = %lock_type,
            operation,
            holder_pid = ?last_status.as_ref().map(|s| s.pid),
            age_secs = ?last_status.as_ref().map(|s| s.age_secs),
            "lock acquisition timed out"
        );
        Err(LockError::Timeout {
            lock_type,
            operation: operation.to_string(),
            attempts: max_attempts,
            holder_pid: last_status.as_ref().map(|s| s.pid),
            age_secs: last_status.as_ref().map(|s| s.age_secs),
        })
    }

    /// Scoped acquisition: runs `f` with the lock held, always releasing
    /// afterward.
    pub fn with_lock<T>(
        &self,
        lock_type: LockType,
        operation: &str,
        budget: AttemptBudget,
        f: impl FnOnce() -> T,
    ) -> Result<T, LockError> {
        let handle = self.acquire(lock_type, operation, budget)?;
        let guard = LockGuard {
            manager: self,
            handle,
        };
        let result = f();
        drop(guard);
        Ok(result)
    }

    /// Any other lock type currently held that conflicts with
    /// `lock_type` per the spec's conflict matrix.
    fn conflicting_holder(&self, lock_type: LockType) -> Option<LockStatus> {
        [
            LockType::Write,
            LockType::Batch,
            LockType::Config,
            LockType::Maintenance,
        ]
        .into_iter()
        .filter(|&t| t != lock_type && lock_type.conflicts_with(t))
        .find_map(|t| self.read_status(&self.lock_dir(t), t))
    }

    fn try_create(&self, dir: &Path, lock_type: LockType, operation: &str) -> io::Result<()> {
        fs::create_dir(dir)?;
        let pid = std::process::id();
        let timestamp = now_iso();
        let hostname = hostname();
        let user = username();

        fs::write(dir.join("pid"), pid.to_string())?;
        fs::write(dir.join("timestamp"), &timestamp)?;
        fs::write(dir.join("hostname"), &hostname)?;
        fs::write(dir.join("user"), &user)?;
        fs::write(dir.join("operation"), operation)?;
        fs::write(dir.join("lock_type"), lock_type.to_string())?;
        Ok(())
    }

    fn read_status(&self, dir: &Path, lock_type: LockType) -> Option<LockStatus> {
        let pid: u32 = fs::read_to_string(dir.join("pid")).ok()?.trim().parse().ok()?;
        let timestamp = fs::read_to_string(dir.join("timestamp")).ok()?.trim().to_string();
        let hostname = fs::read_to_string(dir.join("hostname")).unwrap_or_default();
        let user = fs::read_to_string(dir.join("user")).unwrap_or_default();
        let operation = fs::read_to_string(dir.join("operation")).unwrap_or_default();

        let age_secs = epoch_secs_from_iso(&timestamp)
            .map(|t| now_epoch_secs().saturating_sub(t))
            .unwrap_or(u64::MAX);
        let local_host = hostname == self::hostname();
        let dead = !pid_is_alive(pid);

        let stale = dead || age_secs > STALE_AGE.as_secs() || (!local_host && dead);

        Some(LockStatus {
            lock_type,
            pid,
            timestamp,
            hostname,
            user,
            operation,
            age_secs,
            stale,
        })
    }

    /// Release a held lock, verifying PID ownership.
    pub fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        if let Some(status) = self.read_status(&handle.dir, handle.lock_type) {
            if status.pid != handle.pid {
                return Err(LockError::NotOwner {
                    expected: status.pid,
                    actual: handle.pid,
                });
            }
        }
        if handle.dir.exists() {
            fs::remove_dir_all(&handle.dir)?;
        }
        Ok(())
    }

    /// Force-remove a lock directory regardless of ownership or age.
    pub fn force_unlock(&self, lock_type: LockType) -> Result<(), LockError> {
        let dir = self.lock_dir(lock_type);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Report the current holder of each lock type, if any.
    pub fn status(&self) -> Vec<LockStatus> {
        [
            LockType::Write,
            LockType::Batch,
            LockType::Config,
            LockType::Maintenance,
        ]
        .into_iter()
        .filter_map(|t| self.read_status(&self.lock_dir(t), t))
        .collect()
    }

    /// Remove any lock directories whose holder is stale. Idempotent.
    pub fn cleanup_stale(&self) -> usize {
        let mut removed = 0;
        for t in [
            LockType::Write,
            LockType::Batch,
            LockType::Config,
            LockType::Maintenance,
        ] {
            let dir = self.lock_dir(t);
            if let Some(status) = self.read_status(&dir, t) {
                if status.stale && fs::remove_dir_all(&dir).is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

/// RAII wrapper releasing a [`LockHandle`] on drop.
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    handle: LockHandle,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.manager.release(&self.handle) {
            warn!(error = %e, "failed to release lock on drop");
        }
    }
}

fn jittered(base: Duration, cap: Duration) -> Duration {
    let base = base.min(cap);
    let mut rng = rand::thread_rng();
    let jitter_frac = rng.gen_range(-0.10..=0.10);
    let millis = (base.as_secs_f64() * (1.0 + jitter_frac)).max(0.0);
    Duration::from_secs_f64(millis).min(cap)
}

fn now_iso() -> String {
    warden_core::time_fmt::iso8601(now_epoch_ms())
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn now_epoch_secs() -> u64 {
    now_epoch_ms() / 1000
}

fn epoch_secs_from_iso(s: &str) -> Option<u64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp().max(0) as u64)
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}

fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string())
}

#[cfg(unix)]
fn pid_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_then_release_round_trips() {
        let dir = tempdir().unwrap();
        let mgr = LockManager::new(dir.path(), BackoffMode::Cli);
        let handle = mgr
            .acquire(LockType::Write, "add_task", AttemptBudget::Quick)
            .unwrap();
        assert_eq!(handle.pid, std::process::id());
        mgr.release(&handle).unwrap();
        assert!(mgr.status().is_empty());
    }

    #[test]
    fn conflicting_lock_type_blocks_until_released() {
        let dir = tempdir().unwrap();
        let mgr = LockManager::new(dir.path(), BackoffMode::Cli);
        let write_handle = mgr
            .acquire(LockType::Write, "add_task", AttemptBudget::Quick)
            .unwrap();

        let err = mgr
            .acquire(LockType::Batch, "import", AttemptBudget::Quick)
            .unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));

        mgr.release(&write_handle).unwrap();
        let batch_handle = mgr
            .acquire(LockType::Batch, "import", AttemptBudget::Quick)
            .unwrap();
        mgr.release(&batch_handle).unwrap();
    }

    #[test]
    fn stale_lock_is_cleaned_up_and_reacquired() {
        let dir = tempdir().unwrap();
        let mgr = LockManager::new(dir.path(), BackoffMode::Cli);
        let lock_dir = dir.path().join(".write.lock.d");
        fs::create_dir(&lock_dir).unwrap();
        fs::write(lock_dir.join("pid"), "999999999").unwrap();
        fs::write(
            lock_dir.join("timestamp"),
            warden_core::time_fmt::iso8601(now_epoch_ms() - 11 * 60 * 1000),
        )
        .unwrap();
        fs::write(lock_dir.join("hostname"), hostname()).unwrap();
        fs::write(lock_dir.join("user"), username()).unwrap();
        fs::write(lock_dir.join("operation"), "add_task").unwrap();
        fs::write(lock_dir.join("lock_type"), "write").unwrap();

        let handle = mgr
            .acquire(LockType::Write, "add_task", AttemptBudget::Quick)
            .unwrap();
        mgr.release(&handle).unwrap();
    }

    #[test]
    fn cleanup_stale_is_idempotent() {
        let dir = tempdir().unwrap();
        let mgr = LockManager::new(dir.path(), BackoffMode::Cli);
        assert_eq!(mgr.cleanup_stale(), 0);
        assert_eq!(mgr.cleanup_stale(), 0);
    }

    #[test]
    fn release_refuses_when_pid_mismatches() {
        let dir = tempdir().unwrap();
        let mgr = LockManager::new(dir.path(), BackoffMode::Cli);
        let mut handle = mgr
            .acquire(LockType::Config, "set", AttemptBudget::Quick)
            .unwrap();
        handle.pid = handle.pid.wrapping_add(1);
        let err = mgr.release(&handle).unwrap_err();
        assert!(matches!(err, LockError::NotOwner { .. }));
    }
}
