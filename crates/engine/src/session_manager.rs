// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks live assistant sessions keyed by project, delegating terminal
//! I/O to a `SessionAdapter`.

use crate::usage_limit::parse_usage_limit;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use warden_adapters::{SessionAdapter, SessionError};
use warden_core::clock::Clock;
use warden_core::session::{project_id_for, ProjectId, SessionId, SessionRecord};

pub use warden_core::session::SessionState;

#[derive(Debug, Error)]
pub enum SessionManagerError {
    #[error("no session tracked for project {0}")]
    NotFound(String),
    #[error("project {0} already restarted {1} time(s), at its max_restarts limit")]
    MaxRestartsExceeded(String, u32),
    #[error(transparent)]
    Adapter(#[from] SessionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A tracked session entry: the spec-shaped record plus the bookkeeping
/// timestamp eviction needs (`last_seen_epoch` is touched on every health
/// check, so it can't answer "how long has it been in this state").
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub record: SessionRecord,
    pub state_since_epoch_secs: u64,
}

struct Registry {
    by_project: HashMap<String, SessionHandle>,
}

/// Manages the lifecycle of assistant sessions, one per project.
pub struct SessionManager<A: SessionAdapter> {
    adapter: A,
    registry: Arc<Mutex<Registry>>,
    max_tracked_sessions: usize,
    stopped_cleanup_age_secs: u64,
    error_cleanup_age_secs: u64,
    max_restarts: u32,
    session_file_dir: PathBuf,
}

/// `project_id = sanitize(basename(path))[:30] + "-" + hex6(sha256(path))`
pub fn project_id(canonical_path: &Path) -> String {
    project_id_for(canonical_path).0
}

impl<A: SessionAdapter> SessionManager<A> {
    pub fn new(adapter: A, max_tracked_sessions: usize, stopped_cleanup_age_secs: u64, error_cleanup_age_secs: u64) -> Self {
        Self::with_restart_policy(
            adapter,
            max_tracked_sessions,
            stopped_cleanup_age_secs,
            error_cleanup_age_secs,
            warden_core::config::Config::default().max_restarts,
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
        )
    }

    pub fn with_restart_policy(
        adapter: A,
        max_tracked_sessions: usize,
        stopped_cleanup_age_secs: u64,
        error_cleanup_age_secs: u64,
        max_restarts: u32,
        session_file_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            adapter,
            registry: Arc::new(Mutex::new(Registry {
                by_project: HashMap::new(),
            })),
            max_tracked_sessions,
            stopped_cleanup_age_secs,
            error_cleanup_age_secs,
            max_restarts,
            session_file_dir: session_file_dir.into(),
        }
    }

    /// Start (or reuse) a session for `project_name` rooted at
    /// `working_dir`. Refuses to restart a project past `max_restarts`.
    pub async fn start(
        &self,
        project_name: &str,
        working_dir: &Path,
        command: &str,
        clock: &impl Clock,
    ) -> Result<String, SessionManagerError> {
        let pid = project_id(working_dir);

        let existing = self.registry.lock().by_project.get(&pid).cloned();
        if let Some(existing) = &existing {
            if existing.record.state == SessionState::Running {
                return Ok(existing.record.session_id.clone());
            }
        }

        let prior_restart_count = existing.as_ref().map_or(0, |h| h.record.restart_count);
        if existing.is_some() && prior_restart_count >= self.max_restarts {
            return Err(SessionManagerError::MaxRestartsExceeded(pid, prior_restart_count));
        }

        let now = clock.epoch_secs();
        let now_iso = warden_core::time_fmt::iso8601(clock.epoch_ms());
        let project_id_struct = ProjectId(pid.clone());
        let provisional_id = SessionId::generate(&project_id_struct, now, std::process::id()).0;

        let restart_count = existing.as_ref().map_or(0, |_| prior_restart_count + 1);
        let recovery_count = existing.as_ref().map_or(0, |h| h.record.recovery_count);

        {
            let mut record = SessionRecord::new(
                provisional_id.clone(),
                project_id_struct,
                project_name.to_string(),
                working_dir.to_path_buf(),
                &now_iso,
                now,
            );
            record.restart_count = restart_count;
            record.recovery_count = recovery_count;
            self.registry.lock().by_project.insert(
                pid.clone(),
                SessionHandle {
                    record,
                    state_since_epoch_secs: now,
                },
            );
        }

        let session_id = self.adapter.spawn(&provisional_id, working_dir, command, &[]).await?;

        self.write_session_file(&pid, &session_id)?;

        let mut registry = self.registry.lock();
        if let Some(handle) = registry.by_project.get_mut(&pid) {
            handle.record.session_id = session_id.clone();
            handle.record.set_state(SessionState::Running, &now_iso, now);
            handle.state_since_epoch_secs = now;
        }
        drop(registry);
        self.evict_if_over_capacity(now);

        Ok(session_id)
    }

    /// Force a restart even if the tracked session currently looks
    /// `running` — used by `automatic_recovery` when the session is alive
    /// but misbehaving.
    pub async fn restart(
        &self,
        project_name: &str,
        working_dir: &Path,
        command: &str,
        clock: &impl Clock,
    ) -> Result<String, SessionManagerError> {
        let pid = project_id(working_dir);
        // Best-effort: the session may already be dead.
        let _ = self.stop(&pid, clock).await;
        self.start(project_name, working_dir, command, clock).await
    }

    pub async fn stop(&self, project_id: &str, clock: &impl Clock) -> Result<(), SessionManagerError> {
        let session_id = {
            let registry = self.registry.lock();
            registry
                .by_project
                .get(project_id)
                .map(|h| h.record.session_id.clone())
                .ok_or_else(|| SessionManagerError::NotFound(project_id.to_string()))?
        };

        self.adapter.kill(&session_id).await?;
        self.remove_session_file(project_id);

        let now = clock.epoch_secs();
        let now_iso = warden_core::time_fmt::iso8601(clock.epoch_ms());
        let mut registry = self.registry.lock();
        if let Some(handle) = registry.by_project.get_mut(project_id) {
            handle.record.set_state(SessionState::Stopped, &now_iso, now);
            handle.state_since_epoch_secs = now;
        }
        Ok(())
    }

    /// (a) the multiplexer reports the session alive -> `running`;
    /// (b) else the session file still exists and is non-empty -> `running`
    /// (the multiplexer probe itself may be flaky); (c) else `stopped`. An
    /// adapter error is treated as `error` and the (potentially corrupt)
    /// session file is removed so the next `start` doesn't trust it.
    pub async fn health_check(&self, project_id: &str, clock: &impl Clock) -> Result<SessionState, SessionManagerError> {
        let session_id = {
            let registry = self.registry.lock();
            registry
                .by_project
                .get(project_id)
                .map(|h| h.record.session_id.clone())
                .ok_or_else(|| SessionManagerError::NotFound(project_id.to_string()))?
        };

        let new_state = match self.adapter.is_alive(&session_id).await {
            Ok(true) => SessionState::Running,
            Ok(false) if self.session_file_is_nonempty(project_id) => SessionState::Running,
            Ok(false) => SessionState::Stopped,
            Err(_) => {
                self.remove_session_file(project_id);
                SessionState::Error
            }
        };

        let now = clock.epoch_secs();
        let now_iso = warden_core::time_fmt::iso8601(clock.epoch_ms());
        let mut registry = self.registry.lock();
        if let Some(handle) = registry.by_project.get_mut(project_id) {
            let changed = handle.record.state != new_state;
            handle.record.set_state(new_state, &now_iso, now);
            if changed {
                handle.state_since_epoch_secs = now;
            }
        }
        Ok(new_state)
    }

    /// Capture the session's last-N lines and test them against the
    /// usage-limit patterns.
    pub async fn detect_usage_limit(&self, project_id: &str, now_epoch_secs: u64, max_wait_seconds: u64) -> Result<bool, SessionManagerError> {
        let output = self.capture_output(project_id, 200).await?;
        let detected = parse_usage_limit(&output, now_epoch_secs, max_wait_seconds).is_some();

        if detected {
            let now_iso = warden_core::time_fmt::iso8601(now_epoch_secs * 1000);
            let mut registry = self.registry.lock();
            if let Some(handle) = registry.by_project.get_mut(project_id) {
                let changed = handle.record.state != SessionState::UsageLimited;
                handle.record.set_state(SessionState::UsageLimited, &now_iso, now_epoch_secs);
                if changed {
                    handle.state_since_epoch_secs = now_epoch_secs;
                }
            }
        }
        Ok(detected)
    }

    pub async fn send_command(&self, project_id: &str, text: &str) -> Result<(), SessionManagerError> {
        let session_id = self.session_id_for(project_id)?;
        self.adapter.send_literal(&session_id, text).await?;
        self.adapter.send_enter(&session_id).await?;
        Ok(())
    }

    pub async fn capture_output(&self, project_id: &str, lines: u32) -> Result<String, SessionManagerError> {
        let session_id = self.session_id_for(project_id)?;
        Ok(self.adapter.capture_output(&session_id, lines).await?)
    }

    pub fn find_by_project(&self, project_id: &str) -> Option<String> {
        self.registry.lock().by_project.get(project_id).map(|h| h.record.session_id.clone())
    }

    pub fn list(&self) -> Vec<SessionHandle> {
        self.registry.lock().by_project.values().cloned().collect()
    }

    fn session_id_for(&self, project_id: &str) -> Result<String, SessionManagerError> {
        self.registry
            .lock()
            .by_project
            .get(project_id)
            .map(|h| h.record.session_id.clone())
            .ok_or_else(|| SessionManagerError::NotFound(project_id.to_string()))
    }

    /// Drop stale `stopped`/`error` entries once the registry exceeds
    /// `max_tracked_sessions`.
    fn evict_if_over_capacity(&self, now_epoch_secs: u64) {
        let mut registry = self.registry.lock();
        if registry.by_project.len() <= self.max_tracked_sessions {
            return;
        }

        registry.by_project.retain(|_, handle| {
            let age = now_epoch_secs.saturating_sub(handle.state_since_epoch_secs);
            let evictable = match handle.record.state {
                SessionState::Stopped => age > self.stopped_cleanup_age_secs,
                SessionState::Error => age > self.error_cleanup_age_secs,
                _ => false,
            };
            !evictable
        });
    }

    pub fn mark_recovery_attempt(&self, project_id: &str) {
        let mut registry = self.registry.lock();
        if let Some(handle) = registry.by_project.get_mut(project_id) {
            handle.record.recovery_count += 1;
        }
    }

    pub fn reset_recovery_count(&self, project_id: &str) {
        let mut registry = self.registry.lock();
        if let Some(handle) = registry.by_project.get_mut(project_id) {
            handle.record.recovery_count = 0;
        }
    }

    pub fn reset_restart_count(&self, project_id: &str) {
        let mut registry = self.registry.lock();
        if let Some(handle) = registry.by_project.get_mut(project_id) {
            handle.record.restart_count = 0;
        }
    }

    fn session_file_path(&self, project_id: &str) -> PathBuf {
        self.session_file_dir.join(format!(".assistant_session_{project_id}"))
    }

    fn write_session_file(&self, project_id: &str, session_id: &str) -> Result<(), SessionManagerError> {
        fs::write(self.session_file_path(project_id), session_id)?;
        Ok(())
    }

    fn remove_session_file(&self, project_id: &str) {
        let _ = fs::remove_file(self.session_file_path(project_id));
    }

    fn session_file_is_nonempty(&self, project_id: &str) -> bool {
        fs::metadata(self.session_file_path(project_id)).map(|m| m.len() > 0).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use warden_adapters::FakeSessionAdapter;
    use warden_core::clock::FakeClock;

    fn make_manager(adapter: FakeSessionAdapter, file_dir: &Path) -> SessionManager<FakeSessionAdapter> {
        SessionManager::with_restart_policy(adapter, 100, 1800, 900, 5, file_dir)
    }

    #[test]
    fn project_id_sanitizes_and_truncates() {
        let id = project_id(Path::new("/home/user/My Cool Project!!"));
        assert!(id.starts_with("My-Cool-Project-"));
    }

    #[test]
    fn project_id_falls_back_to_root_for_empty_basename() {
        let id = project_id(Path::new("/"));
        assert!(id.starts_with("root-"));
    }

    #[tokio::test]
    async fn start_reuses_running_session_for_same_project() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter, files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/my-project");

        let first = manager.start("my-project", &dir, "echo hi", &clock).await.unwrap();
        let second = manager.start("my-project", &dir, "echo hi", &clock).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn start_writes_a_session_file() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter, files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj-file");

        manager.start("proj-file", &dir, "echo hi", &clock).await.unwrap();
        let pid = project_id(&dir);
        let contents = fs::read_to_string(files.path().join(format!(".assistant_session_{pid}"))).unwrap();
        assert!(!contents.is_empty());
    }

    #[tokio::test]
    async fn stop_removes_the_session_file() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter, files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj-file-2");

        manager.start("proj-file-2", &dir, "echo hi", &clock).await.unwrap();
        let pid = project_id(&dir);
        manager.stop(&pid, &clock).await.unwrap();
        assert!(!files.path().join(format!(".assistant_session_{pid}")).exists());
    }

    #[tokio::test]
    async fn health_check_reports_stopped_when_adapter_says_dead_and_file_gone() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter.clone(), files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj2");
        manager.start("proj2", &dir, "echo hi", &clock).await.unwrap();

        let pid = project_id(&dir);
        let sid = manager.find_by_project(&pid).unwrap();
        adapter.set_exited(&sid, 1);
        fs::remove_file(files.path().join(format!(".assistant_session_{pid}"))).unwrap();

        let state = manager.health_check(&pid, &clock).await.unwrap();
        assert_eq!(state, SessionState::Stopped);
    }

    #[tokio::test]
    async fn health_check_falls_back_to_session_file_when_adapter_says_dead() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter.clone(), files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj2b");
        manager.start("proj2b", &dir, "echo hi", &clock).await.unwrap();

        let pid = project_id(&dir);
        let sid = manager.find_by_project(&pid).unwrap();
        adapter.set_exited(&sid, 1);
        // Session file (written by `start`) is still present and non-empty.

        let state = manager.health_check(&pid, &clock).await.unwrap();
        assert_eq!(state, SessionState::Running);
    }

    #[tokio::test]
    async fn detect_usage_limit_flips_state() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter.clone(), files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj3");
        manager.start("proj3", &dir, "echo hi", &clock).await.unwrap();
        let pid = project_id(&dir);
        let sid = manager.find_by_project(&pid).unwrap();
        adapter.set_output(&sid, vec!["Error: usage limit reached".to_string()]);

        let detected = manager.detect_usage_limit(&pid, 0, 1800).await.unwrap();
        assert!(detected);
        let handle = manager.list().into_iter().find(|h| h.record.project_id == pid).unwrap();
        assert_eq!(handle.record.state, SessionState::UsageLimited);
    }

    #[tokio::test]
    async fn not_found_when_project_never_started() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter, files.path());
        let clock = FakeClock::new(0);
        let err = manager.stop("ghost-abc123", &clock).await.unwrap_err();
        assert!(matches!(err, SessionManagerError::NotFound(_)));
    }

    #[tokio::test]
    async fn restarting_a_stopped_session_increments_restart_count() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter, files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj4");

        manager.start("proj4", &dir, "echo hi", &clock).await.unwrap();
        let pid = project_id(&dir);
        manager.stop(&pid, &clock).await.unwrap();
        manager.start("proj4", &dir, "echo hi", &clock).await.unwrap();

        let handle = manager.list().into_iter().find(|h| h.record.project_id == pid).unwrap();
        assert_eq!(handle.record.restart_count, 1);
    }

    #[tokio::test]
    async fn start_refuses_once_max_restarts_is_reached() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = SessionManager::with_restart_policy(adapter, 100, 1800, 900, 2, files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj-maxr");

        manager.start("proj-maxr", &dir, "echo hi", &clock).await.unwrap();
        let pid = project_id(&dir);
        for _ in 0..2 {
            manager.stop(&pid, &clock).await.unwrap();
            manager.start("proj-maxr", &dir, "echo hi", &clock).await.unwrap();
        }

        manager.stop(&pid, &clock).await.unwrap();
        let err = manager.start("proj-maxr", &dir, "echo hi", &clock).await.unwrap_err();
        assert!(matches!(err, SessionManagerError::MaxRestartsExceeded(_, 2)));
    }

    #[tokio::test]
    async fn restart_respawns_even_when_adapter_reports_alive() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter.clone(), files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj-restart");

        let first = manager.restart("proj-restart", &dir, "echo hi", &clock).await.unwrap();
        let second = manager.restart("proj-restart", &dir, "echo hi", &clock).await.unwrap();
        assert_ne!(first, second);
        let pid = project_id(&dir);
        let handle = manager.list().into_iter().find(|h| h.record.project_id == pid).unwrap();
        assert_eq!(handle.record.restart_count, 1);
    }

    #[tokio::test]
    async fn reset_recovery_and_restart_counts_zero_them_out() {
        let files = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let manager = make_manager(adapter, files.path());
        let clock = FakeClock::new(0);
        let dir = PathBuf::from("/tmp/proj5");

        manager.start("proj5", &dir, "echo hi", &clock).await.unwrap();
        let pid = project_id(&dir);
        manager.mark_recovery_attempt(&pid);
        manager.stop(&pid, &clock).await.unwrap();
        manager.start("proj5", &dir, "echo hi", &clock).await.unwrap();

        manager.reset_recovery_count(&pid);
        manager.reset_restart_count(&pid);

        let handle = manager.list().into_iter().find(|h| h.record.project_id == pid).unwrap();
        assert_eq!(handle.record.recovery_count, 0);
        assert_eq!(handle.record.restart_count, 0);
    }
}
