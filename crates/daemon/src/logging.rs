// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon logging: always-on JSON-lines to a rotating file under the
//! state directory, independent of `--debug`.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber. The returned [`WorkerGuard`] must be
/// held for the lifetime of the process — dropping it stops the
/// background flush thread.
pub fn init_logging(log_dir: &Path, log_level: &str) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "supervisor.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
