// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session state: job outcomes, resources and metadata.
//!
//! A `SessionState` is the unit that gets checkpointed. Everything the
//! engine needs to pick up after a crash or a reboot lives here: the
//! run list, one `JobState` per job, the resource records of finished
//! resource jobs, and `running_job_id` for the job that was in flight.

use crate::job::{JobDefinition, JobId, Plugin};
use crate::resource::{parse_records, Resource};
use crate::result::{JobState, Outcome};
use crate::unit::UnitStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

crate::define_id! {
    /// Unique identifier for a session, also its directory name on disk.
    pub struct SessionId;
}

impl SessionId {
    pub fn generate() -> Self {
        Self::new(format!("ses-{}", nanoid::nanoid!(12, &nanoid::alphabet::SAFE)))
    }

    /// Usable as a single directory name: ASCII letters, digits, `-`, `_`
    /// and `.`, not starting with a dot.
    pub fn is_valid(&self) -> bool {
        !self.is_empty()
            && !self.starts_with('.')
            && self.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

/// Session has not finished yet; only such sessions are offered for resume.
pub const FLAG_INCOMPLETE: &str = "incomplete";
/// Session is still in its bootstrap phase.
pub const FLAG_BOOTSTRAPPING: &str = "bootstrapping";
/// Results were submitted; the session is kept only for reference.
pub const FLAG_SUBMITTED: &str = "submitted";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    /// Set while a job executes; non-null after a crash mid-job.
    #[serde(default)]
    pub running_job_id: Option<JobId>,
    /// Opaque application data (the encoded launcher configuration).
    #[serde(default)]
    pub app_blob: Vec<u8>,
}

impl SessionMetadata {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: &str, on: bool) {
        if on {
            self.flags.insert(flag.to_string());
        } else {
            self.flags.remove(flag);
        }
    }
}

/// Coarse lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    /// No job has started.
    Fresh,
    /// A job is executing (or was, when the process died).
    Running,
    /// Every job in the run list has a terminal outcome.
    Complete,
    /// Stopped between jobs with work left.
    Incomplete,
}

crate::simple_display! {
    SessionStatus {
        Fresh => "fresh",
        Running => "running",
        Complete => "complete",
        Incomplete => "incomplete",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: SessionId,
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub desired_job_list: Vec<JobId>,
    #[serde(default)]
    pub run_list: Vec<JobId>,
    #[serde(default)]
    pub job_state_map: BTreeMap<JobId, JobState>,
    #[serde(default)]
    pub resource_map: BTreeMap<JobId, Vec<Resource>>,
    #[serde(default)]
    pub job_checksums: BTreeMap<JobId, String>,
    #[serde(default)]
    pub pending_verification: Option<JobId>,
    /// Times each job was sent back for another attempt.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub retries: BTreeMap<JobId, u32>,
}

impl SessionState {
    pub fn new(id: SessionId, metadata: SessionMetadata) -> Self {
        Self {
            id,
            metadata,
            desired_job_list: Vec::new(),
            run_list: Vec::new(),
            job_state_map: BTreeMap::new(),
            resource_map: BTreeMap::new(),
            job_checksums: BTreeMap::new(),
            pending_verification: None,
            retries: BTreeMap::new(),
        }
    }

    /// Replace the run list. Existing job states are kept; new jobs start undecided.
    pub fn set_run_list(&mut self, desired: Vec<JobId>, run_list: Vec<JobId>) {
        for job in &run_list {
            self.job_state_map.entry(job.clone()).or_default();
        }
        self.desired_job_list = desired;
        self.run_list = run_list;
    }

    /// Jobs of the run list still lacking a terminal outcome, in order.
    pub fn remaining(&self) -> impl Iterator<Item = &JobId> {
        self.run_list.iter().filter(|id| !self.outcome(id).is_terminal())
    }

    pub fn next_job(&self) -> Option<&JobId> {
        self.remaining().next()
    }

    pub fn outcome(&self, id: &JobId) -> Outcome {
        self.job_state_map.get(id).map(|s| s.outcome).unwrap_or_default()
    }

    pub fn job_state(&self, id: &JobId) -> Option<&JobState> {
        self.job_state_map.get(id)
    }

    pub fn mark_running(&mut self, id: &JobId) {
        self.metadata.running_job_id = Some(id.clone());
        self.metadata.set_flag(FLAG_INCOMPLETE, true);
    }

    /// Record the result of a job, updating resources for resource jobs.
    ///
    /// A terminal outcome clears `running_job_id` and `pending_verification`
    /// when they point at this job. Resource records are replaced only when
    /// the job passed; a failed resource job leaves no records behind.
    pub fn record_result(&mut self, job: &JobDefinition, state: JobState) {
        if state.outcome.is_terminal() {
            if self.metadata.running_job_id.as_ref() == Some(&job.id) {
                self.metadata.running_job_id = None;
            }
            if self.pending_verification.as_ref() == Some(&job.id) {
                self.pending_verification = None;
            }
        }
        if job.plugin == Plugin::Resource {
            if state.outcome == Outcome::Pass {
                self.resource_map.insert(job.id.clone(), parse_records(&state.stdout()));
            } else {
                self.resource_map.remove(&job.id);
            }
        }
        self.job_checksums.insert(job.id.clone(), job.checksum());
        self.job_state_map.insert(job.id.clone(), state);
        if self.run_list.iter().all(|id| self.outcome(id).is_terminal()) {
            self.metadata.set_flag(FLAG_INCOMPLETE, false);
        }
    }

    /// Park a job whose outcome the operator has to give.
    ///
    /// The job stops counting as running, so a restart offers it for
    /// verification again instead of running it a second time.
    pub fn await_verification(&mut self, job: &JobDefinition, state: JobState) {
        self.record_result(job, state);
        if self.metadata.running_job_id.as_ref() == Some(&job.id) {
            self.metadata.running_job_id = None;
        }
        self.pending_verification = Some(job.id.clone());
    }

    pub fn set_resource_list(&mut self, id: &JobId, records: Vec<Resource>) {
        self.resource_map.insert(id.clone(), records);
    }

    pub fn resources(&self, id: &JobId) -> Option<&[Resource]> {
        self.resource_map.get(id).map(Vec::as_slice)
    }

    /// Copy of the state with captured output dropped, for summaries that
    /// travel over the wire. Per-job output stays available via `job_state`.
    pub fn without_io_logs(&self) -> Self {
        let mut state = self.clone();
        for job in state.job_state_map.values_mut() {
            job.io_log.clear();
        }
        state
    }

    pub fn status(&self) -> SessionStatus {
        if self.metadata.running_job_id.is_some() {
            return SessionStatus::Running;
        }
        let decided = self.run_list.iter().filter(|id| self.outcome(id).is_terminal()).count();
        if !self.run_list.is_empty() && decided == self.run_list.len() {
            SessionStatus::Complete
        } else if decided == 0 {
            SessionStatus::Fresh
        } else {
            SessionStatus::Incomplete
        }
    }

    /// Send failed jobs back to undecided while they have attempts left.
    ///
    /// `max_attempts` counts the first run. Returns the requeued ids.
    pub fn retry_failed(&mut self, max_attempts: u32) -> Vec<JobId> {
        let failed: Vec<JobId> = self
            .run_list
            .iter()
            .filter(|id| self.outcome(id) == Outcome::Fail)
            .filter(|id| self.retries.get(*id).copied().unwrap_or(0) + 1 < max_attempts)
            .cloned()
            .collect();
        self.requeue(&failed);
        failed
    }

    /// Decided jobs an operator may run again: anything but a pass.
    pub fn rerun_candidates(&self) -> Vec<JobId> {
        self.run_list
            .iter()
            .filter(|id| matches!(self.outcome(id), Outcome::Fail | Outcome::Skip | Outcome::NotSupported))
            .cloned()
            .collect()
    }

    /// Send jobs back to undecided, counting one more attempt for each.
    pub fn requeue(&mut self, ids: &[JobId]) {
        for id in ids {
            *self.retries.entry(id.clone()).or_default() += 1;
            self.job_state_map.insert(id.clone(), JobState::default());
            self.resource_map.remove(id);
        }
        if !ids.is_empty() {
            self.metadata.set_flag(FLAG_INCOMPLETE, true);
        }
    }

    /// Narrow the run list to the jobs `keep` accepts.
    ///
    /// Decided jobs stay so their results are not lost. Order is kept,
    /// so a run list that was dependency-ordered stays that way.
    pub fn retain_jobs(&mut self, desired: Vec<JobId>, keep: impl Fn(&JobId) -> bool) {
        let decided: BTreeSet<JobId> =
            self.run_list.iter().filter(|id| self.outcome(id).is_terminal()).cloned().collect();
        self.run_list.retain(|id| keep(id) || decided.contains(id));
        self.desired_job_list = desired;
        self.metadata.set_flag(FLAG_INCOMPLETE, self.next_job().is_some());
    }

    /// Reset results recorded against a definition that has since changed.
    ///
    /// Returns the ids that went back to undecided. Their resource records
    /// are dropped so dependants re-evaluate against fresh output.
    pub fn invalidate_stale(&mut self, units: &UnitStore) -> Vec<JobId> {
        let mut stale = Vec::new();
        for (id, state) in self.job_state_map.iter_mut() {
            if !state.outcome.is_terminal() {
                continue;
            }
            let Some(recorded) = self.job_checksums.get(id) else { continue };
            let Some(job) = units.job(id) else { continue };
            if job.checksum() != *recorded {
                *state = JobState::default();
                stale.push(id.clone());
            }
        }
        for id in &stale {
            self.resource_map.remove(id);
            self.job_checksums.remove(id);
        }
        if !stale.is_empty() {
            self.metadata.set_flag(FLAG_INCOMPLETE, true);
        }
        stale
    }
}

/// A persisted session that can be picked up again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeCandidate {
    pub session_id: SessionId,
    pub metadata: SessionMetadata,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
