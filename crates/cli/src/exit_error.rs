// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Carries an explicit process exit code through an `anyhow::Error`.
//! `main` downcasts the returned error to recover the code; anything
//! that doesn't downcast exits `1`.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

pub fn validation(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(ExitError {
        code: 2,
        message: msg.into(),
    })
}

pub fn usage_limit_failure(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(ExitError {
        code: 3,
        message: msg.into(),
    })
}

pub fn interrupted() -> anyhow::Error {
    anyhow::Error::new(ExitError {
        code: 130,
        message: "interrupted".to_string(),
    })
}
