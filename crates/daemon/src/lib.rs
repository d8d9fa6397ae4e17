// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The continuous supervisor binary's supporting library: state-directory
//! layout, the single-instance PID lock, and log initialization.

pub mod lifecycle;
pub mod logging;

pub use lifecycle::{DaemonLock, LifecycleError, Paths};
pub use logging::init_logging;
