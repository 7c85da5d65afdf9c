// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent state shared by every connection.
//!
//! The assistant sits behind an async mutex held for one operation at a
//! time. Reads (`GetState`, `GetJobResult`) are served from a snapshot
//! published after each operation, so they never wait for a running job.

use std::sync::atomic::{AtomicU64, Ordering};

use ck_core::{SessionId, SessionState};
use ck_engine::{AbortHandle, SessionAssistant};
use ck_storage::SessionRepository;
use parking_lot::Mutex;
use tokio::sync::MutexGuard;
use tracing::debug;

pub type ConnectionId = u64;

/// Who holds the driving lock of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Connection(ConnectionId),
    /// The agent runs a silent session on its own.
    Autopilot,
}

pub struct Agent {
    assistant: tokio::sync::Mutex<SessionAssistant>,
    abort: AbortHandle,
    repo: SessionRepository,
    snapshot: Mutex<Option<SessionState>>,
    driver: Mutex<Option<Driver>>,
    next_connection: AtomicU64,
}

impl Agent {
    pub fn new(assistant: SessionAssistant) -> Self {
        let abort = assistant.abort_handle();
        let repo = assistant.repository().clone();
        let snapshot = Mutex::new(assistant.get_state().cloned());
        Self {
            assistant: tokio::sync::Mutex::new(assistant),
            abort,
            repo,
            snapshot,
            driver: Mutex::new(None),
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn assistant(&self) -> MutexGuard<'_, SessionAssistant> {
        self.assistant.lock().await
    }

    /// Refresh the snapshot served to readers.
    pub fn publish(&self, assistant: &SessionAssistant) {
        *self.snapshot.lock() = assistant.get_state().cloned();
    }

    pub fn snapshot(&self) -> Option<SessionState> {
        self.snapshot.lock().clone()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.snapshot.lock().as_ref().map(|s| s.id.clone())
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repo
    }

    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    pub fn driver(&self) -> Option<Driver> {
        *self.driver.lock()
    }

    pub fn autopilot(&self) -> bool {
        self.driver() == Some(Driver::Autopilot)
    }

    /// Take the driving lock. Fails while someone else holds it.
    pub fn acquire(&self, who: Driver) -> bool {
        let mut driver = self.driver.lock();
        match *driver {
            Some(holder) if holder != who => false,
            _ => {
                if driver.is_none() {
                    debug!(driver = ?who, "driving lock taken");
                }
                *driver = Some(who);
                true
            }
        }
    }

    pub fn release(&self, who: Driver) {
        let mut driver = self.driver.lock();
        if *driver == Some(who) {
            debug!(driver = ?who, "driving lock released");
            *driver = None;
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
