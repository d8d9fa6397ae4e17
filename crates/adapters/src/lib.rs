// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the two external processes the supervisor drives: a
//! terminal multiplexer hosting assistant sessions, and (optionally) a
//! work-item tracker.

pub mod session;
pub mod subprocess;
pub mod tracker;

pub use session::{NoOpSessionAdapter, SessionAdapter, SessionError, TmuxAdapter};
pub use tracker::{NoopTrackerAdapter, TrackedItem, TrackerAdapter, TrackerError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSession, FakeSessionAdapter, SessionCall};
#[cfg(any(test, feature = "test-support"))]
pub use tracker::FakeTrackerAdapter;
