// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session adapter for deterministic engine/daemon tests.

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum SessionCall {
    Spawn {
        name: String,
        cwd: PathBuf,
        cmd: String,
        env: Vec<(String, String)>,
    },
    Send { id: String, input: String },
    SendLiteral { id: String, text: String },
    SendEnter { id: String },
    Kill { id: String },
    IsAlive { id: String },
    CaptureOutput { id: String, lines: u32 },
}

#[derive(Debug, Clone)]
pub struct FakeSession {
    pub name: String,
    pub cwd: PathBuf,
    pub cmd: String,
    pub output: Vec<String>,
    pub alive: bool,
    pub exit_code: Option<i32>,
}

struct FakeSessionState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
    next_id: u64,
    spawn_should_fail: bool,
}

#[derive(Clone)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeSessionState>>,
}

impl Default for FakeSessionAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSessionState {
                sessions: HashMap::new(),
                calls: Vec::new(),
                next_id: 0,
                spawn_should_fail: false,
            })),
        }
    }
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    pub fn get_session(&self, id: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(id).cloned()
    }

    pub fn set_output(&self, id: &str, output: Vec<String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(id) {
            session.output = output;
        }
    }

    pub fn set_exited(&self, id: &str, exit_code: i32) {
        if let Some(session) = self.inner.lock().sessions.get_mut(id) {
            session.alive = false;
            session.exit_code = Some(exit_code);
        }
    }

    /// Make every subsequent `spawn()` call fail, simulating a
    /// multiplexer that can't be brought back up during recovery.
    pub fn set_spawn_should_fail(&self, should_fail: bool) {
        self.inner.lock().spawn_should_fail = should_fail;
    }

    pub fn add_session(&self, id: &str, alive: bool) {
        self.inner.lock().sessions.insert(
            id.to_string(),
            FakeSession {
                name: id.to_string(),
                cwd: PathBuf::new(),
                cmd: String::new(),
                output: Vec::new(),
                alive,
                exit_code: None,
            },
        );
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();
        if inner.spawn_should_fail {
            return Err(SessionError::SpawnFailed(name.to_string()));
        }
        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);
        inner.calls.push(SessionCall::Spawn {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            cmd: cmd.to_string(),
            env: env.to_vec(),
        });
        inner.sessions.insert(
            id.clone(),
            FakeSession {
                name: name.to_string(),
                cwd: cwd.to_path_buf(),
                cmd: cmd.to_string(),
                output: Vec::new(),
                alive: true,
                exit_code: None,
            },
        );
        Ok(id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Send {
            id: id.to_string(),
            input: input.to_string(),
        });
        if !inner.sessions.contains_key(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_literal(&self, id: &str, text: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::SendLiteral {
            id: id.to_string(),
            text: text.to_string(),
        });
        if !inner.sessions.contains_key(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_enter(&self, id: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::SendEnter { id: id.to_string() });
        if !inner.sessions.contains_key(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Kill { id: id.to_string() });
        if let Some(session) = inner.sessions.get_mut(id) {
            session.alive = false;
        }
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::IsAlive { id: id.to_string() });
        Ok(inner.sessions.get(id).map(|s| s.alive).unwrap_or(false))
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CaptureOutput {
            id: id.to_string(),
            lines,
        });
        match inner.sessions.get(id) {
            Some(session) => {
                let start = session.output.len().saturating_sub(lines as usize);
                Ok(session.output[start..].join("\n"))
            }
            None => Err(SessionError::NotFound(id.to_string())),
        }
    }

    async fn get_exit_code(&self, id: &str) -> Result<Option<i32>, SessionError> {
        let inner = self.inner.lock();
        Ok(inner.sessions.get(id).and_then(|s| s.exit_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_registers_session_and_records_call() {
        let adapter = FakeSessionAdapter::new();
        let id = adapter
            .spawn("proj", Path::new("/tmp"), "echo hi", &[])
            .await
            .unwrap();
        assert!(adapter.get_session(&id).unwrap().alive);
        assert_eq!(adapter.calls().len(), 1);
    }

    #[tokio::test]
    async fn send_to_unknown_session_is_not_found() {
        let adapter = FakeSessionAdapter::new();
        let err = adapter.send("ghost", "hi").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn capture_output_returns_last_n_lines() {
        let adapter = FakeSessionAdapter::new();
        let id = adapter.spawn("p", Path::new("/tmp"), "x", &[]).await.unwrap();
        adapter.set_output(&id, vec!["a".into(), "b".into(), "c".into()]);
        let out = adapter.capture_output(&id, 2).await.unwrap();
        assert_eq!(out, "b\nc");
    }
}
