// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tmux-backed session adapter — the production terminal multiplexer.

use super::{SessionAdapter, SessionError};
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// tmux-based session adapter.
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, args: &[&str], description: &str) -> Result<std::process::Output, SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        run_with_timeout(cmd, TMUX_TIMEOUT, description)
            .await
            .map_err(SessionError::CommandFailed)
    }
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, SessionError> {
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        // `name` is already the fully-formed session id (the caller builds
        // it so it matches the documented `sess-<project_id>-<epoch>-<pid>`
        // shape); this adapter just uses it as the tmux target verbatim.
        let session_id = name.to_string();

        let existing = self.run(&["has-session", "-t", &session_id], "tmux has-session").await;
        if matches!(existing, Ok(out) if out.status.success()) {
            tracing::warn!(session_id, "session already exists, killing first");
            let _ = self
                .run(&["kill-session", "-t", &session_id], "tmux kill-session")
                .await;
        }

        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(&session_id)
            .arg("-c")
            .arg(cwd);
        for (key, value) in env {
            tmux_cmd.arg("-e").arg(format!("{key}={value}"));
        }
        tmux_cmd.arg(cmd);

        let output = run_with_timeout(tmux_cmd, TMUX_TIMEOUT, "tmux new-session")
            .await
            .map_err(SessionError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session_id, stderr = %stderr, "tmux spawn failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        Ok(session_id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        let output = self.run(&["send-keys", "-t", id, input], "tmux send-keys").await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_literal(&self, id: &str, text: &str) -> Result<(), SessionError> {
        let output = self
            .run(&["send-keys", "-t", id, "-l", "--", text], "tmux send-keys -l")
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_enter(&self, id: &str) -> Result<(), SessionError> {
        let output = self.run(&["send-keys", "-t", id, "Enter"], "tmux send-keys Enter").await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        // Killing an already-dead session is not an error: the caller
        // only wants it gone.
        let _ = self.run(&["kill-session", "-t", id], "tmux kill-session").await;
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        let output = self.run(&["has-session", "-t", id], "tmux has-session").await?;
        Ok(output.status.success())
    }

    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SessionError> {
        let lines_arg = format!("-{lines}");
        let output = self
            .run(
                &["capture-pane", "-t", id, "-p", "-S", &lines_arg],
                "tmux capture-pane",
            )
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn get_exit_code(&self, id: &str) -> Result<Option<i32>, SessionError> {
        let output = self
            .run(
                &["display-message", "-t", id, "-p", "#{pane_dead_status}"],
                "tmux display-message",
            )
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        let status_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if status_str.is_empty() {
            return Ok(None);
        }
        Ok(status_str.parse::<i32>().ok())
    }
}
