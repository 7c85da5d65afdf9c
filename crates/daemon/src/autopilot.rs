// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running silent sessions without a controller.

use std::sync::Arc;

use ck_core::{LauncherConfig, ResumeCandidate};
use ck_engine::RunStep;
use tracing::{error, info, warn};

use crate::agent::{Agent, Driver};

/// Newest candidate whose launcher runs silently.
///
/// Candidates whose launcher blob cannot be decoded are treated as
/// interactive and left for a controller.
pub fn silent_candidate(candidates: &[ResumeCandidate]) -> Option<&ResumeCandidate> {
    candidates.iter().find(|c| {
        if c.metadata.app_blob.is_empty() {
            return false;
        }
        match LauncherConfig::from_app_blob(&c.metadata.app_blob) {
            Ok(launcher) => launcher.is_silent(),
            Err(e) => {
                warn!(session = %c.session_id, error = %e, "unreadable launcher configuration");
                false
            }
        }
    })
}

/// Drive the active session until it finishes, then hand the lock back.
///
/// The caller must already hold the lock as [`Driver::Autopilot`].
pub async fn drive(agent: Arc<Agent>) {
    loop {
        let step = {
            let mut assistant = agent.assistant().await;
            let step = assistant.run_next().await;
            agent.publish(&assistant);
            step
        };
        match step {
            Ok(RunStep::Ran { job, state }) => {
                info!(job = %job, outcome = %state.outcome, "autopilot step");
            }
            Ok(RunStep::AwaitingVerification { job }) => {
                warn!(job = %job, "job needs verification, waiting for a controller");
                break;
            }
            Ok(RunStep::Finished) => {
                info!(session = ?agent.active_session(), "autopilot finished the session");
                break;
            }
            Err(e) => {
                error!(error = %e, "autopilot stopped");
                break;
            }
        }
    }
    agent.release(Driver::Autopilot);
}

#[cfg(test)]
#[path = "autopilot_tests.rs"]
mod tests;
