// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one-cycle state machine every monitor invocation runs through.
//! Owns no event loop itself — `warden-daemon` and the
//! CLI's `monitor` subcommand both drive it by calling
//! [`MonitorLoop::run_one_cycle`] on their own schedule.

use crate::classifier::ErrorClassifier;
use crate::recovery::RecoveryEngine;
use crate::session_manager::{project_id, SessionManager, SessionState};
use crate::usage_limit::{parse_usage_limit, UsageLimitMatch, UsageLimitWaiter};
use chrono::DateTime;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tokio::time::Duration;
use warden_adapters::SessionAdapter;
use warden_core::checkpoint::{Checkpoint, CheckpointReason};
use warden_core::clock::Clock;
use warden_core::config::Config;
use warden_core::lock::LockType;
use warden_core::severity::Severity;
use warden_core::task::TaskStatus;
use warden_core::usage_limit::PauseMarker;
use warden_storage::{AttemptBudget, BackoffMode, CheckpointStore, LockManager, QueueStore};

/// Best-effort RFC3339 -> epoch-seconds, used only to re-derive "how much
/// longer to wait" from a persisted [`PauseMarker`].
fn parse_epoch_secs(rfc3339: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(rfc3339)
        .ok()
        .map(|dt| dt.timestamp().max(0) as u64)
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Queue(#[from] warden_storage::QueueStoreError),
    #[error(transparent)]
    Checkpoint(#[from] warden_storage::CheckpointStoreError),
    #[error(transparent)]
    Lock(#[from] warden_storage::LockError),
    #[error(transparent)]
    Session(#[from] crate::session_manager::SessionManagerError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened during one call to [`MonitorLoop::run_one_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A usage-limit pause is active; the caller should sleep
    /// `remaining_secs` (or less) before the next cycle.
    WaitingOnUsageLimit { remaining_secs: u64 },
    /// No pending task was available to dispatch.
    Idle,
    /// A task was dispatched and reached a terminal outcome this cycle.
    TaskCompleted { task_id: String },
    TaskFailed { task_id: String, reason: String },
    TaskTimedOut { task_id: String },
    /// A usage limit was detected while a task was running; the queue is
    /// now paused and the task was checkpointed.
    UsageLimitDetected { task_id: Option<String>, wait_seconds: u64 },
}

/// The supervisor's state machine for one project.
pub struct MonitorLoop<A: SessionAdapter> {
    queue_store: QueueStore,
    checkpoint_store: CheckpointStore,
    lock_manager: LockManager,
    session_manager: SessionManager<A>,
    recovery_engine: RecoveryEngine,
    classifier: ErrorClassifier,
    usage_waiter: UsageLimitWaiter,
    config: Config,
    project_name: String,
    working_dir: PathBuf,
    pause_marker_path: PathBuf,
    assistant_command: String,
}

impl<A: SessionAdapter> MonitorLoop<A> {
    pub fn new(
        queue_dir: impl Into<PathBuf>,
        session_manager: SessionManager<A>,
        config: Config,
        project_name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        assistant_command: impl Into<String>,
    ) -> Self {
        let queue_dir = queue_dir.into();
        let pause_marker_path = queue_dir.join("usage-limit-pause.marker");
        Self {
            queue_store: QueueStore::new(&queue_dir),
            checkpoint_store: CheckpointStore::new(&queue_dir),
            lock_manager: LockManager::new(&queue_dir, BackoffMode::Daemon),
            session_manager,
            recovery_engine: RecoveryEngine::new(),
            classifier: ErrorClassifier::new(),
            usage_waiter: UsageLimitWaiter::new(config.usage_limit_cooldown, config.backoff_factor, config.max_wait_time),
            project_name: project_name.into(),
            working_dir: working_dir.into(),
            pause_marker_path,
            assistant_command: assistant_command.into(),
            config,
        }
    }

    fn project_id(&self) -> String {
        project_id(&self.working_dir)
    }

    /// Run exactly one cycle of the state machine.
    pub async fn run_one_cycle(&mut self, clock: &(impl Clock + Sync)) -> Result<CycleOutcome, MonitorError> {
        let now = clock.epoch_secs();

        // Step 1: usage-limit precheck.
        let mut resuming_from_usage_limit = false;
        if let Some(marker) = self.read_pause_marker()? {
            let resume_epoch = parse_epoch_secs(&marker.estimated_resume_time).unwrap_or(now);
            if now < resume_epoch {
                return Ok(CycleOutcome::WaitingOnUsageLimit {
                    remaining_secs: resume_epoch - now,
                });
            }
            self.clear_pause_marker()?;
            self.unpause_queue()?;
            resuming_from_usage_limit = true;
        }

        // Step 2: session health.
        let pid = self.project_id();
        let existing = self.session_manager.find_by_project(&pid);
        if existing.is_none() {
            self.session_manager
                .start(&self.project_name, &self.working_dir, &self.assistant_command, clock)
                .await?;
        } else {
            let state = self.session_manager.health_check(&pid, clock).await?;
            if resuming_from_usage_limit {
                // Spec'd usage-limit recovery loop: re-check after the wait,
                // reset the counter on success, else count the attempt.
                if state == SessionState::Running {
                    self.session_manager.reset_recovery_count(&pid);
                } else {
                    self.session_manager.mark_recovery_attempt(&pid);
                }
            }
            if state == SessionState::Running {
                let limited = self
                    .session_manager
                    .detect_usage_limit(&pid, now, self.config.max_wait_time)
                    .await?;
                if limited {
                    return self.enter_usage_limit_pause(None, now);
                }
            } else if self.config.auto_recovery_enabled {
                self.session_manager
                    .start(&self.project_name, &self.working_dir, &self.assistant_command, clock)
                    .await?;
            }
        }

        // Step 3: dispatch.
        let mut doc = self.queue_store.load()?;
        if doc.paused {
            return Ok(CycleOutcome::Idle);
        }
        let Some(task) = doc.next_pending().cloned() else {
            return Ok(CycleOutcome::Idle);
        };

        // Step 4: execute task.
        self.execute_task(task.id.clone(), clock).await
    }

    async fn execute_task(&mut self, task_id: String, clock: &(impl Clock + Sync)) -> Result<CycleOutcome, MonitorError> {
        let pid = self.project_id();

        self.transition_task(&task_id, TaskStatus::InProgress, clock, None)?;

        let doc = self.queue_store.load()?;
        let task = doc.find(&task_id).cloned().ok_or_else(|| {
            MonitorError::Session(crate::session_manager::SessionManagerError::NotFound(task_id.clone()))
        })?;

        self.session_manager.send_command(&pid, &task.command).await?;

        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));
        let max_polls = (task.timeout_seconds / self.config.poll_interval_seconds.max(1)).max(1);

        for _ in 0..max_polls {
            tokio::time::sleep(poll_interval).await;
            let output = self.session_manager.capture_output(&pid, 200).await?;

            if output.contains(&self.config.task_completion_pattern) {
                self.transition_task(&task_id, TaskStatus::Completed, clock, None)?;
                self.session_manager.reset_recovery_count(&pid);
                self.session_manager.reset_restart_count(&pid);
                return Ok(CycleOutcome::TaskCompleted { task_id });
            }

            let now = clock.epoch_secs();
            if let Some(usage_match) = parse_usage_limit(&output, now, self.config.max_wait_time) {
                self.checkpoint_task(&task_id, CheckpointReason::UsageLimit, clock, None)?;
                return self.enter_usage_limit_pause_with_match(Some(task_id), now, usage_match);
            }

            let classified = self.classifier.classify_and_record(&output, None, Some(&task_id), now);
            if classified.severity != Severity::Unknown {
                match self.recover_task(&task_id, classified.severity, &output, clock).await? {
                    Some(outcome) => return Ok(outcome),
                    // Session recovery succeeded; the task is still
                    // `InProgress` and its command was resent — keep polling.
                    None => continue,
                }
            }
        }

        // Exceeded the poll budget without a sentinel: timeout.
        self.transition_task(&task_id, TaskStatus::Timeout, clock, Some(("task timed out", None)))?;
        let outcome = self.recovery_engine.recover_timeout(&task_id, task.timeout_seconds, self.config.task_retry_delay);
        if let Some(new_timeout) = outcome.new_timeout_seconds {
            self.with_write_lock(|| {
                let mut doc = self.queue_store.load()?;
                if let Some(t) = doc.find_mut(&task_id) {
                    t.timeout_seconds = new_timeout;
                    t.retry(clock).ok();
                }
                doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
                self.queue_store.save(&doc, "timeout_recovery")?;
                Ok::<_, MonitorError>(())
            })??;
        }
        Ok(CycleOutcome::TaskTimedOut { task_id })
    }

    /// Run the recovery engine against one classified error and carry out
    /// whatever it decides. Returns `Ok(None)` when the session was
    /// recovered and the task's command was resent — the caller should
    /// keep polling the same task instead of ending the cycle.
    async fn recover_task(
        &mut self,
        task_id: &str,
        severity: Severity,
        output: &str,
        clock: &(impl Clock + Sync),
    ) -> Result<Option<CycleOutcome>, MonitorError> {
        let history = vec![output.to_string()];
        let doc = self.queue_store.load()?;
        let (retry_count, max_retries) = doc
            .find(task_id)
            .map(|t| (t.retry_count, t.max_retries))
            .unwrap_or((0, self.config.task_max_retries));

        let outcome = self.recovery_engine.recover(
            task_id,
            severity,
            retry_count,
            max_retries,
            self.config.auto_recovery_enabled,
            self.config.task_retry_delay,
            history,
        );

        if let Some(reason) = outcome.checkpoint_reason {
            self.checkpoint_task(task_id, reason, clock, Some(output.to_string()))?;
        }

        if outcome.pause_queue {
            self.pause_queue()?;
        }

        if outcome.attempt_session_recovery {
            return self.attempt_automatic_recovery(task_id, output, clock).await;
        }

        if let Some(fail_reason) = outcome.fail_with_reason.clone() {
            self.transition_task(task_id, TaskStatus::Failed, clock, Some((output, Some(fail_reason.as_str()))))?;
            return Ok(Some(CycleOutcome::TaskFailed {
                task_id: task_id.to_string(),
                reason: fail_reason,
            }));
        }

        if outcome.retry_delay_secs.is_some() {
            self.transition_task(task_id, TaskStatus::Failed, clock, Some((output, None)))?;
            self.with_write_lock(|| {
                let mut doc = self.queue_store.load()?;
                if let Some(t) = doc.find_mut(task_id) {
                    let _ = t.retry(clock);
                }
                doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
                self.queue_store.save(&doc, "simple_retry")?;
                Ok::<_, MonitorError>(())
            })??;
            return Ok(Some(CycleOutcome::TaskFailed {
                task_id: task_id.to_string(),
                reason: "simple_retry".to_string(),
            }));
        }

        Ok(Some(CycleOutcome::TaskFailed {
            task_id: task_id.to_string(),
            reason: outcome.strategy.to_string(),
        }))
    }

    /// `automatic_recovery`: restart the session in place and resend the
    /// task's command so dispatch resumes without ending the cycle. If the
    /// session can't be brought back, fail the task forward into a retry
    /// instead of leaving it stuck `InProgress` with nothing re-dispatching
    /// it.
    async fn attempt_automatic_recovery(
        &mut self,
        task_id: &str,
        output: &str,
        clock: &(impl Clock + Sync),
    ) -> Result<Option<CycleOutcome>, MonitorError> {
        let pid = self.project_id();
        self.session_manager.mark_recovery_attempt(&pid);

        let restarted = self
            .session_manager
            .restart(&self.project_name, &self.working_dir, &self.assistant_command, clock)
            .await
            .is_ok();

        if restarted {
            let doc = self.queue_store.load()?;
            if let Some(task) = doc.find(task_id) {
                self.session_manager.send_command(&pid, &task.command).await?;
            }
            return Ok(None);
        }

        self.transition_task(
            task_id,
            TaskStatus::Failed,
            clock,
            Some((output, Some("automatic_recovery_failed"))),
        )?;
        self.with_write_lock(|| {
            let mut doc = self.queue_store.load()?;
            if let Some(t) = doc.find_mut(task_id) {
                let _ = t.retry(clock);
            }
            doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
            self.queue_store.save(&doc, "automatic_recovery_failed")?;
            Ok::<_, MonitorError>(())
        })??;
        Ok(Some(CycleOutcome::TaskFailed {
            task_id: task_id.to_string(),
            reason: "automatic_recovery_failed".to_string(),
        }))
    }

    fn enter_usage_limit_pause(&mut self, task_id: Option<String>, now: u64) -> Result<CycleOutcome, MonitorError> {
        self.enter_usage_limit_pause_with_match(
            task_id,
            now,
            UsageLimitMatch::Generic {
                pattern: "usage_limited".to_string(),
            },
        )
    }

    fn enter_usage_limit_pause_with_match(
        &mut self,
        task_id: Option<String>,
        now: u64,
        usage_match: UsageLimitMatch,
    ) -> Result<CycleOutcome, MonitorError> {
        let (wait_seconds, pattern) = match usage_match {
            UsageLimitMatch::TimeAnchored { pattern, wait_seconds } => (wait_seconds, pattern),
            UsageLimitMatch::Generic { pattern } => (self.usage_waiter.next_backoff_wait(), pattern),
        };

        let pause_time = warden_core::time_fmt::iso8601(now * 1000);
        let resume_time = warden_core::time_fmt::iso8601((now + wait_seconds) * 1000);
        let marker = PauseMarker::new(
            pause_time,
            wait_seconds,
            resume_time,
            task_id.clone(),
            pattern,
            self.usage_waiter.occurrence_count(),
        );
        self.write_pause_marker(&marker)?;
        self.pause_queue()?;

        Ok(CycleOutcome::UsageLimitDetected { task_id, wait_seconds })
    }

    fn transition_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        clock: &impl Clock,
        error_detail: Option<(&str, Option<&str>)>,
    ) -> Result<(), MonitorError> {
        self.with_write_lock(|| {
            let mut doc = self.queue_store.load()?;
            if let Some(task) = doc.find_mut(task_id) {
                task.transition(status, clock, error_detail).ok();
            }
            doc.refresh(&warden_core::time_fmt::iso8601(clock.epoch_ms()));
            self.queue_store.save(&doc, &status.to_string())?;
            Ok::<_, MonitorError>(())
        })??;
        Ok(())
    }

    fn checkpoint_task(
        &self,
        task_id: &str,
        reason: CheckpointReason,
        clock: &impl Clock,
        note: Option<String>,
    ) -> Result<(), MonitorError> {
        let doc = self.queue_store.load()?;
        let retry_count = doc.find(task_id).map(|t| t.retry_count).unwrap_or(0);
        let mut checkpoint = Checkpoint::new(
            task_id,
            reason,
            clock.epoch_secs(),
            warden_core::time_fmt::iso8601(clock.epoch_ms()),
            retry_count,
        );
        if let Some(note) = note {
            checkpoint = checkpoint.with_note(note);
        }
        self.checkpoint_store.write(&checkpoint)?;
        Ok(())
    }

    fn pause_queue(&self) -> Result<(), MonitorError> {
        self.with_write_lock(|| {
            let mut doc = self.queue_store.load()?;
            doc.paused = true;
            self.queue_store.save(&doc, "pause")?;
            Ok::<_, MonitorError>(())
        })??;
        Ok(())
    }

    fn unpause_queue(&self) -> Result<(), MonitorError> {
        self.with_write_lock(|| {
            let mut doc = self.queue_store.load()?;
            doc.paused = false;
            self.queue_store.save(&doc, "resume")?;
            Ok::<_, MonitorError>(())
        })??;
        Ok(())
    }

    fn with_write_lock<T>(&self, f: impl FnOnce() -> T) -> Result<T, MonitorError> {
        Ok(self
            .lock_manager
            .with_lock(LockType::Write, "monitor_cycle", AttemptBudget::Quick, f)?)
    }

    fn read_pause_marker(&self) -> Result<Option<PauseMarker>, MonitorError> {
        if !self.pause_marker_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.pause_marker_path)?;
        Ok(serde_json::from_str(&contents).ok())
    }

    /// Strict variant of [`Self::read_pause_marker`] that surfaces a
    /// malformed marker as an error instead of treating it as absent.
    /// Used by the interactive CLI to distinguish "no pause active" from
    /// "couldn't tell".
    pub fn check_usage_limit_status(&self) -> Result<Option<PauseMarker>, MonitorError> {
        if !self.pause_marker_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.pause_marker_path)?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| MonitorError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    fn write_pause_marker(&self, marker: &PauseMarker) -> Result<(), MonitorError> {
        if let Some(parent) = self.pause_marker_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(marker).unwrap_or_default();
        fs::write(&self.pause_marker_path, json)?;
        Ok(())
    }

    fn clear_pause_marker(&mut self) -> Result<(), MonitorError> {
        if self.pause_marker_path.exists() {
            fs::remove_file(&self.pause_marker_path)?;
        }
        self.usage_waiter.reset();
        Ok(())
    }

    pub fn queue_store(&self) -> &QueueStore {
        &self.queue_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;
    use warden_adapters::FakeSessionAdapter;
    use warden_core::clock::FakeClock;
    use warden_core::task::{Task, TaskConfig, TaskType};

    fn make_loop(dir: &Path, adapter: FakeSessionAdapter, config: Config) -> MonitorLoop<FakeSessionAdapter> {
        let session_manager = SessionManager::with_restart_policy(
            adapter,
            config.max_tracked_sessions,
            config.stopped_session_cleanup_minutes * 60,
            config.error_session_cleanup_minutes * 60,
            config.max_restarts,
            dir,
        );
        MonitorLoop::new(dir, session_manager, config, "proj", dir, "assistant --flag")
    }

    fn fast_config() -> Config {
        let mut c = Config::default();
        c.poll_interval_seconds = 0;
        c
    }

    #[tokio::test]
    async fn idle_cycle_when_queue_empty() {
        let dir = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let mut monitor = make_loop(dir.path(), adapter, fast_config());
        let clock = FakeClock::new(0);
        let outcome = monitor.run_one_cycle(&clock).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
    }

    #[tokio::test]
    async fn dispatches_and_completes_task_on_sentinel() {
        let dir = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let config = fast_config();
        let clock = FakeClock::new(0);

        let store = QueueStore::new(dir.path());
        let mut doc = store.load().unwrap();
        doc.tasks.push(
            Task::new(
                TaskConfig {
                    id: "task-1".to_string(),
                    task_type: TaskType::Custom,
                    command: Some("do the thing".to_string()),
                    ..Default::default()
                },
                &clock,
            )
            .unwrap(),
        );
        doc.refresh("t0");
        store.save(&doc, "seed").unwrap();

        let mut monitor = make_loop(dir.path(), adapter.clone(), config);
        // First cycle starts the session.
        monitor.run_one_cycle(&clock).await.unwrap();

        let pid = project_id(dir.path());
        let sid = monitor.session_manager.find_by_project(&pid).unwrap();
        adapter.set_output(&sid, vec!["###TASK_COMPLETE###".to_string()]);

        let outcome = monitor.run_one_cycle(&clock).await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::TaskCompleted {
                task_id: "task-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn usage_limit_in_output_pauses_queue() {
        let dir = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let config = fast_config();
        let clock = FakeClock::new(0);

        let store = QueueStore::new(dir.path());
        let mut doc = store.load().unwrap();
        doc.tasks.push(
            Task::new(
                TaskConfig {
                    id: "task-1".to_string(),
                    task_type: TaskType::Custom,
                    command: Some("do the thing".to_string()),
                    ..Default::default()
                },
                &clock,
            )
            .unwrap(),
        );
        doc.refresh("t0");
        store.save(&doc, "seed").unwrap();

        let mut monitor = make_loop(dir.path(), adapter.clone(), config);
        monitor.run_one_cycle(&clock).await.unwrap();

        let pid = project_id(dir.path());
        let sid = monitor.session_manager.find_by_project(&pid).unwrap();
        adapter.set_output(&sid, vec!["Error: usage limit reached, try again later".to_string()]);

        let outcome = monitor.run_one_cycle(&clock).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::UsageLimitDetected { .. }));

        let doc = monitor.queue_store().load().unwrap();
        assert!(doc.paused);
    }

    #[tokio::test]
    async fn resuming_from_usage_limit_pause_resets_recovery_count_when_healthy() {
        let dir = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let config = fast_config();
        let clock = FakeClock::new(100);

        let mut monitor = make_loop(dir.path(), adapter.clone(), config);
        monitor
            .session_manager
            .start("proj", dir.path(), "assistant --flag", &clock)
            .await
            .unwrap();
        let pid = project_id(dir.path());
        monitor.session_manager.mark_recovery_attempt(&pid);
        monitor.session_manager.mark_recovery_attempt(&pid);

        let marker = PauseMarker::new(
            "2026-01-01T00:00:00Z".to_string(),
            0,
            warden_core::time_fmt::iso8601(0),
            None,
            "usage limit".to_string(),
            1,
        );
        monitor.write_pause_marker(&marker).unwrap();

        monitor.run_one_cycle(&clock).await.unwrap();

        let handle = monitor.session_manager.list().into_iter().find(|h| h.record.project_id == pid).unwrap();
        assert_eq!(handle.record.recovery_count, 0);
    }

    fn seed_in_progress_task(dir: &Path, clock: &FakeClock) {
        let store = QueueStore::new(dir);
        let mut doc = store.load().unwrap();
        let mut task = Task::new(
            TaskConfig {
                id: "task-1".to_string(),
                task_type: TaskType::Custom,
                command: Some("do the thing".to_string()),
                ..Default::default()
            },
            clock,
        )
        .unwrap();
        task.transition(TaskStatus::InProgress, clock, None).unwrap();
        doc.tasks.push(task);
        doc.refresh("t0");
        store.save(&doc, "seed").unwrap();
    }

    #[tokio::test]
    async fn warning_severity_recovers_session_and_keeps_task_in_progress() {
        let dir = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let config = fast_config();
        let clock = FakeClock::new(0);
        seed_in_progress_task(dir.path(), &clock);

        let mut monitor = make_loop(dir.path(), adapter.clone(), config);
        // Session already running before the classified error is seen.
        monitor
            .session_manager
            .start("proj", dir.path(), "assistant --flag", &clock)
            .await
            .unwrap();
        let spawns_before = adapter.calls().len();

        let outcome = monitor
            .recover_task("task-1", Severity::Warning, "Error: connection refused", &clock)
            .await
            .unwrap();

        // `None` means the caller should keep polling this task instead
        // of ending the cycle — the session was recovered, not orphaned.
        assert_eq!(outcome, None);
        assert!(adapter.calls().len() > spawns_before, "expected a restart + resend through the adapter");

        let doc = monitor.queue_store().load().unwrap();
        assert_eq!(doc.find("task-1").unwrap().status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn automatic_recovery_reschedules_task_when_session_restart_fails() {
        let dir = tempdir().unwrap();
        let adapter = FakeSessionAdapter::new();
        let config = fast_config();
        let clock = FakeClock::new(0);
        seed_in_progress_task(dir.path(), &clock);

        let mut monitor = make_loop(dir.path(), adapter.clone(), config);
        monitor
            .session_manager
            .start("proj", dir.path(), "assistant --flag", &clock)
            .await
            .unwrap();
        adapter.set_spawn_should_fail(true);

        let outcome = monitor
            .recover_task("task-1", Severity::Warning, "Error: connection refused", &clock)
            .await
            .unwrap();

        assert!(matches!(outcome, Some(CycleOutcome::TaskFailed { .. })));

        let doc = monitor.queue_store().load().unwrap();
        let task = doc.find("task-1").unwrap();
        // Never left stuck `InProgress`: failed forward and retried back
        // to `Pending` so the next cycle re-dispatches it.
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 1);
    }
}
