// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::time::Duration;

const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_LOG: &str = "warn";

/// How long the controller keeps reconnecting (`CK_RECONNECT_TIMEOUT_MS`, default 10 min).
pub fn reconnect_timeout() -> Duration {
    std::env::var("CK_RECONNECT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_RECONNECT_TIMEOUT)
}

/// `NO_COLOR=1`
pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

/// `COLOR=1`
pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

/// Log filter directives (`CK_LOG`, default `warn`).
pub fn log_directives() -> String {
    match std::env::var("CK_LOG") {
        Ok(directives) if !directives.trim().is_empty() => directives,
        _ => DEFAULT_LOG.to_string(),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
