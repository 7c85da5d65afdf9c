// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

/// The session ran to completion but at least one job failed.
pub const EXIT_JOBS_FAILED: i32 = 2;
/// The controller could not tell which session to continue.
pub const EXIT_RESUME_AMBIGUOUS: i32 = 3;
/// The agent stayed unreachable past the reconnect deadline.
pub const EXIT_UNREACHABLE: i32 = 4;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn jobs_failed(failed: usize) -> Self {
        Self::new(EXIT_JOBS_FAILED, format!("{failed} job(s) failed"))
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
