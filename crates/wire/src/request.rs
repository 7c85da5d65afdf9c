// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ck_core::{JobId, LauncherConfig, Outcome, SessionId};
use serde::{Deserialize, Serialize};

/// Request from controller to agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Version handshake
    Hello { version: String },

    /// Health check ping
    Ping,

    /// Sessions that can be resumed
    ListResumable,

    /// Make a persisted session the active one and drive it
    ResumeById { session_id: SessionId },

    /// Start a new session and drive it
    StartNew {
        launcher: Box<LauncherConfig>,
        /// Explicit job selection; ignored when the launcher names a test plan
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        jobs: Vec<JobId>,
    },

    /// State of the active session, captured output left out
    GetState,

    /// Result of one job of the active session
    GetJobResult { job_id: JobId },

    /// Run the next job of the active session
    RequestNextJob,

    /// Outcome of a manual job awaiting verification
    Verify {
        job_id: JobId,
        outcome: Outcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comments: Option<String>,
    },

    /// Abort the job currently running
    Abort,

    /// Narrow the main selection once bootstrap is over
    SelectJobs { job_ids: Vec<JobId> },

    /// Decided jobs that did not pass
    GetRerunCandidates,

    /// Send decided jobs back for another attempt
    Rerun { job_ids: Vec<JobId> },

    /// Delete persisted sessions (the active one is kept)
    DeleteSessions { session_ids: Vec<SessionId> },
}

impl Request {
    /// Requests that need the driving lock of the active session.
    pub fn drives_session(&self) -> bool {
        matches!(
            self,
            Request::ResumeById { .. }
                | Request::StartNew { .. }
                | Request::RequestNextJob
                | Request::Verify { .. }
                | Request::Abort
                | Request::SelectJobs { .. }
                | Request::Rerun { .. }
        )
    }

    /// Whether the response may take longer than the IPC timeout.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Request::RequestNextJob | Request::StartNew { .. } | Request::ResumeById { .. })
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
