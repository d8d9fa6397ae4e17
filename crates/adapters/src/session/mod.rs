// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-multiplexer session adapters.

mod noop;
mod tmux;

pub use noop::NoOpSessionAdapter;
pub use tmux::TmuxAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from session operations, part of the external-failure taxonomy.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("multiplexer_unavailable: {0}")]
    MultiplexerUnavailable(String),
}

/// Adapter for managing sessions hosted inside a terminal multiplexer.
///
/// The supervisor never parses the assistant CLI's protocol directly —
/// it only sends text into a pane and captures the pane buffer back.
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Spawn a new session running `cmd` in `cwd`.
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, SessionError>;

    /// Send a line of text, interpreted as tmux key names.
    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError>;

    /// Send literal text with no key-name interpretation.
    async fn send_literal(&self, id: &str, text: &str) -> Result<(), SessionError>;

    /// Send the Enter key.
    async fn send_enter(&self, id: &str) -> Result<(), SessionError>;

    /// Kill the session.
    async fn kill(&self, id: &str) -> Result<(), SessionError>;

    /// Whether the multiplexer still reports this session.
    async fn is_alive(&self, id: &str) -> Result<bool, SessionError>;

    /// Capture the last `lines` of the pane buffer.
    async fn capture_output(&self, id: &str, lines: u32) -> Result<String, SessionError>;

    /// Exit code of the pane's process, if it has exited.
    async fn get_exit_code(&self, id: &str) -> Result<Option<i32>, SessionError>;
}
