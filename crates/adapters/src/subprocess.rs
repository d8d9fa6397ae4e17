// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers shared by the session and tracker
//! adapters.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for tmux control commands.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for health/liveness probe subprocesses.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the assistant CLI's own health probe.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child is
/// killed automatically on timeout via `Child`'s drop implementation.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{description} failed: {io_err}")),
        Err(_elapsed) => Err(format!(
            "{description} timed out after {}s",
            timeout.as_secs()
        )),
    }
}
