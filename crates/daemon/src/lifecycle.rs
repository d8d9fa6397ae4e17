// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-directory layout and the single-instance PID lock that keeps
//! two `wardend` processes from supervising the same project at once.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("another wardend instance already holds the lock at {0}")]
    AlreadyRunning(PathBuf),
    #[error("could not determine a state directory: set WARDEN_STATE_DIR or HOME")]
    NoStateDir,
}

/// Filesystem paths the daemon owns, rooted at a per-project state
/// directory so multiple projects can each run their own `wardend`.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub pid_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    /// Resolve paths for `project_id`, honoring `WARDEN_STATE_DIR` /
    /// `XDG_STATE_HOME` the way the rest of the corpus resolves its state
    /// directory.
    pub fn resolve(project_id: &str) -> Result<Self, LifecycleError> {
        let root = state_root()?;
        let state_dir = root.join(project_id);
        Ok(Self {
            pid_path: state_dir.join("wardend.pid"),
            log_dir: state_dir.join("logs"),
            state_dir,
        })
    }
}

fn state_root() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("warden"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/warden"))
}

/// An exclusive, `fs2`-backed lock on `pid_path`. Held for the lifetime
/// of the daemon process; released automatically on drop.
pub struct DaemonLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl DaemonLock {
    /// Acquire the lock, writing our pid into the file once held.
    /// `OpenOptions::truncate(false)` avoids wiping a running daemon's
    /// pid before we know whether we actually got the lock.
    pub fn acquire(path: &std::path::Path) -> Result<Self, LifecycleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| LifecycleError::AlreadyRunning(path.to_path_buf()))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
