// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ck_core::{JobDefinition, JobId, JobState, ResumeCandidate, SessionId, SessionState};
use serde::{Deserialize, Serialize};

/// What happened to the session on resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResumeSummary {
    /// Jobs reset because their definition changed
    #[serde(default)]
    pub stale: Vec<JobId>,
    /// In-flight job completed from its reboot result
    #[serde(default)]
    pub recovered: Option<JobId>,
    /// In-flight job offered again
    #[serde(default)]
    pub rerun: Option<JobId>,
}

/// Response from agent to controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello {
        version: String,
        /// Session the agent currently holds, if any
        #[serde(default)]
        active_session: Option<SessionId>,
        /// The active session runs on its own, without a controller
        #[serde(default)]
        autopilot: bool,
    },

    /// Error response
    Error { message: String },

    /// Another connection (or the agent itself) drives the active session
    Busy { session_id: Option<SessionId> },

    /// Resumable sessions, newest first
    Sessions { sessions: Vec<ResumeCandidate> },

    /// New session created and resolved
    SessionStarted { session_id: SessionId, run_list: Vec<JobId> },

    /// Persisted session resumed
    Resumed { session_id: SessionId, summary: ResumeSummary },

    /// Active session state
    State { state: Option<Box<SessionState>> },

    /// Result of one job
    JobResult { job_id: JobId, result: Option<JobState> },

    /// A job reached a final outcome
    JobFinished { job_id: JobId, result: JobState },

    /// A manual job waits for `Verify`
    AwaitingVerification { job: Box<JobDefinition> },

    /// Every job of the session is decided
    SessionFinished { session_id: SessionId },

    /// Whether anything was aborted
    Aborted { aborted: bool },

    /// Number of sessions deleted
    Deleted { count: usize },

    /// Run list after a new selection
    JobsSelected { run_list: Vec<JobId> },

    /// Jobs an operator may rerun
    RerunCandidates { job_ids: Vec<JobId> },

    /// Jobs sent back for another attempt, prerequisites included
    Requeued { job_ids: Vec<JobId> },
}
