// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle: configuration and startup.

mod startup;
pub use startup::startup;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use ck_core::{SessionId, UnitError};
use ck_engine::AssistantError;
use ck_storage::StorageError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::agent::Agent;
use crate::env::{agent_port, providers_dir, state_dir};

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/ck)
    pub state_dir: PathBuf,
    /// Daily-rotated agent logs
    pub logs_dir: PathBuf,
    /// Directory of unit files
    pub providers_dir: PathBuf,
    /// Cached results of cachable resource jobs
    pub cache_dir: PathBuf,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Set when the agent runs with root privileges
    pub as_root: bool,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::for_state_dir(state_dir()?))
    }

    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self {
            logs_dir: state_dir.join("logs"),
            providers_dir: providers_dir(&state_dir),
            cache_dir: state_dir.join("cache"),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: agent_port(),
            as_root: nix::unistd::geteuid().is_root(),
            state_dir,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Result of agent startup.
pub struct StartupResult {
    pub agent: Arc<Agent>,
    /// The TCP listener to spawn as a Listener task
    pub listener: TcpListener,
    /// Silent session resumed at startup; the caller drives it
    pub autopilot: Option<SessionId>,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to bind port {0}: {1}")]
    BindFailed(u16, std::io::Error),

    #[error("Unit error: {0}")]
    Units(#[from] UnitError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Assistant(#[from] AssistantError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
