// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent.

use std::path::PathBuf;
use std::time::Duration;

use ck_wire::DEFAULT_PORT;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: CK_STATE_DIR > XDG_STATE_HOME/ck > ~/.local/state/ck
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("CK_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("ck"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/ck"))
}

/// TCP port the agent listens on (`CK_AGENT_PORT`, default 18871).
pub fn agent_port() -> u16 {
    std::env::var("CK_AGENT_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(DEFAULT_PORT)
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    std::env::var("CK_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Directory of `*.toml` provider files: CK_PROVIDERS > <state>/providers
pub fn providers_dir(state_dir: &std::path::Path) -> PathBuf {
    match std::env::var("CK_PROVIDERS") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => state_dir.join("providers"),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
