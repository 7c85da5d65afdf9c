// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session assistant: one session driven job by job.
//!
//! Owns the unit store and coordinates resolution, readiness, controller
//! selection and execution. The session is checkpointed when a job starts
//! and again after every result, so a crash at any point resumes with at
//! most the in-flight job offered again.

use crate::bootstrap::merge_generated;
use crate::controller::{running_as_root, ControllerSelector};
use crate::executor::{ExecContext, JobExecutor, ABORTED};
use crate::readiness::{readiness, Readiness};
use crate::resolver::{DependencyKind, DependencyResolver, ResolveError};
use ck_core::{
    Clock, JobDefinition, JobId, JobState, LauncherConfig, LauncherError, Outcome, Plugin,
    ResumeCandidate, SessionId, SessionMetadata, SessionState, SystemClock, UnitError, UnitStore,
    FLAG_BOOTSTRAPPING, FLAG_INCOMPLETE,
};
use ck_storage::{SessionRepository, SessionStorage, StorageError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// File a rebooting job leaves in the session share to report its result.
pub const REBOOT_RESULT_FILE: &str = "__result";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("no active session")]
    NoSession,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error(transparent)]
    Launcher(#[from] LauncherError),
    #[error("session {0} has no checkpoint")]
    EmptySession(SessionId),
    #[error("job {0} is not awaiting verification")]
    NotAwaitingVerification(JobId),
    #[error("'{0}' is not a final outcome")]
    InvalidVerdict(Outcome),
    #[error("job {0} is awaiting verification")]
    AwaitingVerification(JobId),
    #[error("bootstrap jobs are still pending")]
    StillBootstrapping,
    #[error("job {0} is not in the run list")]
    NotInRunList(JobId),
    #[error("job {0} cannot be rerun")]
    NotRerunnable(JobId),
}

/// Result written by a job that reboots the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebootResult {
    pub outcome: Outcome,
    #[serde(default)]
    pub comments: Option<String>,
}

/// What `run_next` did.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStep {
    /// A job reached a final outcome (possibly without running).
    Ran { job: JobId, state: JobState },
    /// A manual job waits for [`SessionAssistant::verify`].
    AwaitingVerification { job: JobId },
    /// Every job of the run list is decided.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResumeReport {
    /// Jobs reset because their definition changed.
    pub stale: Vec<JobId>,
    /// In-flight job whose result came from the reboot handshake.
    pub recovered: Option<JobId>,
    /// In-flight job that will be offered again.
    pub rerun: Option<JobId>,
}

/// Cancels the job currently executing, from any task.
#[derive(Clone, Default)]
pub struct AbortHandle {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortHandle {
    /// Returns whether a job was running.
    pub fn abort(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock() = Some(token.clone());
        token
    }

    fn disarm(&self) {
        *self.current.lock() = None;
    }
}

struct ActiveSession {
    storage: SessionStorage,
    state: SessionState,
    launcher: LauncherConfig,
    selector: ControllerSelector,
    warmed_up: bool,
}

impl ActiveSession {
    fn checkpoint(&self) -> Result<(), StorageError> {
        self.storage.save_checkpoint(&self.state)
    }

    fn exec_context(&self) -> ExecContext {
        ExecContext {
            session_id: self.state.id.clone(),
            share_dir: self.storage.share_dir(),
            io_log_dir: Some(self.storage.io_log_dir()),
            environment: self.launcher.environment.clone(),
            dry_run: self.launcher.execution.dry_run,
        }
    }

    fn record(&mut self, job: &JobDefinition, state: JobState) -> Result<(), StorageError> {
        info!(session = %self.state.id, job = %job.id, outcome = %state.outcome, "job result");
        self.state.record_result(job, state);
        self.checkpoint()
    }
}

pub struct SessionAssistant<C: Clock = SystemClock> {
    units: UnitStore,
    repo: SessionRepository,
    executor: JobExecutor<C>,
    as_root: bool,
    session: Option<ActiveSession>,
    abort: AbortHandle,
}

impl<C: Clock> SessionAssistant<C> {
    pub fn new(units: UnitStore, repo: SessionRepository, executor: JobExecutor<C>) -> Self {
        Self { units, repo, executor, as_root: running_as_root(), session: None, abort: AbortHandle::default() }
    }

    /// Override privilege detection (controller registry).
    pub fn with_root(mut self, as_root: bool) -> Self {
        self.as_root = as_root;
        self
    }

    pub fn units(&self) -> &UnitStore {
        &self.units
    }

    pub fn repository(&self) -> &SessionRepository {
        &self.repo
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|s| &s.state.id)
    }

    pub fn launcher(&self) -> Option<&LauncherConfig> {
        self.session.as_ref().map(|s| &s.launcher)
    }

    pub fn get_state(&self) -> Option<&SessionState> {
        self.session.as_ref().map(|s| &s.state)
    }

    pub fn job_result(&self, id: &JobId) -> Option<&JobState> {
        self.get_state().and_then(|s| s.job_state(id))
    }

    pub fn list_resumable(&self) -> Result<Vec<ResumeCandidate>, AssistantError> {
        Ok(self.repo.resume_candidates()?)
    }

    /// Delete sessions other than the active one. Returns how many were removed.
    pub fn delete_sessions(&self, ids: &[SessionId]) -> Result<usize, AssistantError> {
        let ids: Vec<SessionId> = ids.iter().filter(|id| Some(*id) != self.session_id()).cloned().collect();
        Ok(self.repo.delete(&ids)?)
    }

    /// Create and checkpoint a new session.
    ///
    /// When the launcher names a test plan it is selected right away.
    pub fn start_session(&mut self, launcher: LauncherConfig) -> Result<SessionId, AssistantError> {
        let id = SessionId::generate();
        let storage = self.repo.create(&id)?;
        let mut metadata = SessionMetadata {
            title: launcher.title().map(str::to_string),
            app_id: launcher.launcher.app_id.clone(),
            app_blob: launcher.to_app_blob()?,
            ..SessionMetadata::default()
        };
        metadata.set_flag(FLAG_INCOMPLETE, true);
        let state = SessionState::new(id.clone(), metadata);
        let selector = ControllerSelector::for_launcher(&launcher, self.as_root);
        let plan = launcher.test_plan.unit.clone();
        let session = ActiveSession { storage, state, launcher, selector, warmed_up: false };
        session.checkpoint()?;
        info!(session = %id, controllers = ?session.selector.names(), "session started");
        self.session = Some(session);

        if let Some(plan) = plan {
            self.select_test_plan(&plan)?;
        }
        Ok(id)
    }

    /// Select jobs through a test plan.
    ///
    /// The plan's bootstrap jobs and any selected `local` jobs form the
    /// bootstrap phase; the main selection is recomputed once they finish,
    /// so generated jobs matching the plan are picked up.
    pub fn select_test_plan(&mut self, plan_id: &str) -> Result<Vec<JobId>, AssistantError> {
        let plan = self.units.test_plan(plan_id)?.clone();
        let mut bootstrap = self.units.bootstrap_jobs(&plan)?;
        let (locals, main) = self.split_locals(self.units.select_jobs(&plan)?);
        for id in locals {
            if !bootstrap.contains(&id) {
                bootstrap.push(id);
            }
        }
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        if session.launcher.test_plan.unit.as_deref() != Some(plan_id) {
            session.launcher.test_plan.unit = Some(plan_id.to_string());
            session.state.metadata.app_blob = session.launcher.to_app_blob()?;
        }
        self.begin(bootstrap, main)
    }

    /// Select an explicit job list. `local` jobs among them run first.
    pub fn resolve(&mut self, requested: &[JobId]) -> Result<Vec<JobId>, AssistantError> {
        let (bootstrap, main) = self.split_locals(requested.to_vec());
        self.begin(bootstrap, main)
    }

    fn split_locals(&self, ids: Vec<JobId>) -> (Vec<JobId>, Vec<JobId>) {
        ids.into_iter().partition(|id| self.units.job(id).is_some_and(|j| j.plugin == Plugin::Local))
    }

    fn begin(&mut self, bootstrap: Vec<JobId>, main: Vec<JobId>) -> Result<Vec<JobId>, AssistantError> {
        let resolver = DependencyResolver::new(&self.units);
        let bootstrapping = !bootstrap.is_empty();
        let run_list = if bootstrapping { resolver.resolve(&bootstrap)? } else { resolver.resolve(&main)? };
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        session.state.set_run_list(main, run_list.clone());
        session.state.metadata.set_flag(FLAG_BOOTSTRAPPING, bootstrapping);
        session.state.metadata.set_flag(FLAG_INCOMPLETE, true);
        session.checkpoint()?;
        info!(session = %session.state.id, jobs = run_list.len(), bootstrapping, "run list resolved");
        Ok(run_list)
    }

    /// Second resolution phase, once every bootstrap job is decided.
    fn finish_bootstrap(&mut self) -> Result<(), AssistantError> {
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        let generated = merge_generated(&mut self.units, &session.state)?;

        let mut main = match session.launcher.test_plan.unit.as_deref() {
            Some(plan_id) => {
                let plan = self.units.test_plan(plan_id)?;
                self.units.select_jobs(plan)?
            }
            None => {
                let mut main = session.state.desired_job_list.clone();
                main.extend(generated.jobs.iter().cloned());
                main
            }
        };
        main.retain(|id| self.units.job(id).is_some_and(|j| j.plugin != Plugin::Local));

        let resolved = DependencyResolver::new(&self.units).resolve(&main)?;
        let mut run_list = session.state.run_list.clone();
        for id in resolved.into_iter().chain(generated.failures.iter().map(|f| f.job.id.clone())) {
            if !run_list.contains(&id) {
                run_list.push(id);
            }
        }
        session.state.set_run_list(main, run_list);
        for failure in &generated.failures {
            session.state.record_result(&failure.job, JobState::with_outcome(Outcome::Fail, failure.message.clone()));
        }
        session.state.metadata.set_flag(FLAG_BOOTSTRAPPING, false);
        session.checkpoint()?;
        info!(session = %session.state.id, jobs = session.state.run_list.len(), "bootstrap finished");
        Ok(())
    }

    /// Narrow the main selection to `selection` and what it needs.
    ///
    /// Only jobs of the current run list can be chosen. When the last
    /// bootstrap job is decided the main selection is resolved first, so
    /// generated jobs are choosable too.
    pub fn select_jobs(&mut self, selection: &[JobId]) -> Result<Vec<JobId>, AssistantError> {
        let state = self.state()?;
        let bootstrapping = state.metadata.has_flag(FLAG_BOOTSTRAPPING);
        if bootstrapping && state.next_job().is_some() {
            return Err(AssistantError::StillBootstrapping);
        }
        if bootstrapping {
            self.finish_bootstrap()?;
        }

        let state = self.state()?;
        if let Some(job) = &state.pending_verification {
            return Err(AssistantError::AwaitingVerification(job.clone()));
        }
        if let Some(id) = selection.iter().find(|id| !state.run_list.contains(id)) {
            return Err(AssistantError::NotInRunList(id.clone()));
        }
        let desired: Vec<JobId> = state.run_list.iter().filter(|id| selection.contains(id)).cloned().collect();
        let needed: HashSet<JobId> = DependencyResolver::new(&self.units).resolve(&desired)?.into_iter().collect();

        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        session.state.retain_jobs(desired, |id| needed.contains(id));
        session.checkpoint()?;
        info!(session = %session.state.id, jobs = session.state.run_list.len(), "job selection narrowed");
        Ok(session.state.run_list.clone())
    }

    /// Decided jobs that did not pass.
    pub fn rerun_candidates(&self) -> Result<Vec<JobId>, AssistantError> {
        Ok(self.state()?.rerun_candidates())
    }

    /// Send `ids` back for another attempt.
    ///
    /// Rerun candidates among their `depends` and resource prerequisites go
    /// back too, so a job skipped for a failed dependency gets a real second
    /// chance. Returns the requeued ids in run-list order.
    pub fn rerun(&mut self, ids: &[JobId]) -> Result<Vec<JobId>, AssistantError> {
        let state = self.state()?;
        if let Some(job) = &state.pending_verification {
            return Err(AssistantError::AwaitingVerification(job.clone()));
        }
        let candidates = state.rerun_candidates();
        if let Some(id) = ids.iter().find(|id| !candidates.contains(id)) {
            return Err(AssistantError::NotRerunnable(id.clone()));
        }

        let resolver = DependencyResolver::new(&self.units);
        let mut chosen: HashSet<JobId> = ids.iter().cloned().collect();
        let mut queue = ids.to_vec();
        while let Some(id) = queue.pop() {
            let Some(job) = self.units.job(&id) else { continue };
            for (dep, kind) in resolver.prerequisites(job)? {
                if kind != DependencyKind::Ordering && candidates.contains(&dep) && chosen.insert(dep.clone()) {
                    queue.push(dep);
                }
            }
        }
        let requeued: Vec<JobId> = state.run_list.iter().filter(|id| chosen.contains(*id)).cloned().collect();

        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        session.state.requeue(&requeued);
        session.checkpoint()?;
        info!(session = %session.state.id, jobs = ?requeued, "rerun requested");
        Ok(requeued)
    }

    /// Invoke each controller the remaining jobs need, once.
    pub async fn warm_up(&mut self) -> Result<(), AssistantError> {
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        let jobs: Vec<&JobDefinition> = session.state.remaining().filter_map(|id| self.units.job(id)).collect();
        for controller in session.selector.warm_up_sequence(jobs) {
            if let Err(e) = controller.warm_up().await {
                warn!(controller = controller.name(), error = %e, "warm-up failed");
            }
        }
        session.warmed_up = true;
        Ok(())
    }

    /// Run the next undecided job.
    ///
    /// When the bootstrap phase runs out of jobs the main selection is
    /// resolved and the first main job runs in the same call.
    pub async fn run_next(&mut self) -> Result<RunStep, AssistantError> {
        let id = loop {
            let state = self.state()?;
            if let Some(job) = &state.pending_verification {
                return Ok(RunStep::AwaitingVerification { job: job.clone() });
            }
            if let Some(id) = state.next_job() {
                break id.clone();
            }
            if state.metadata.has_flag(FLAG_BOOTSTRAPPING) {
                self.finish_bootstrap()?;
                continue;
            }
            let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
            if session.launcher.ui.auto_retry {
                let retried = session.state.retry_failed(session.launcher.ui.max_attempts);
                if !retried.is_empty() {
                    info!(session = %session.state.id, jobs = ?retried, "retrying failed jobs");
                    session.checkpoint()?;
                    continue;
                }
            }
            session.state.metadata.running_job_id = None;
            session.state.metadata.set_flag(FLAG_INCOMPLETE, false);
            session.checkpoint()?;
            info!(session = %session.state.id, "session finished");
            return Ok(RunStep::Finished);
        };

        let Some(job) = self.units.job(&id).cloned() else {
            let placeholder = JobDefinition::new(id.clone(), Plugin::Shell);
            let state = JobState::with_outcome(Outcome::Fail, format!("unknown job: {id}"));
            return self.finish(&placeholder, state);
        };

        let verdict = match readiness(&job, self.state()?, &self.units) {
            Ok(verdict) => verdict,
            Err(e) => Readiness::Skip(e.to_string()),
        };
        match verdict {
            Readiness::Skip(reason) => {
                debug!(job = %id, %reason, "job skipped");
                return self.finish(&job, JobState::with_outcome(Outcome::Skip, reason));
            }
            Readiness::NotSupported(expression) => {
                debug!(job = %id, %expression, "requirement not met");
                return self.finish(&job, JobState::with_outcome(Outcome::NotSupported, expression));
            }
            Readiness::Ready => {}
        }

        if !self.session.as_ref().is_some_and(|s| s.warmed_up) {
            self.warm_up().await?;
        }

        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        session.state.mark_running(&id);
        session.checkpoint()?;
        let ctx = session.exec_context();
        let selected = job.plugin.runs_command().then(|| session.selector.select(&job));

        let result = match selected {
            None => JobState::default(),
            Some(Err(e)) => JobState::with_outcome(Outcome::Fail, e.to_string()),
            Some(Ok(controller)) => {
                let cancel = self.abort.arm();
                let result = self.executor.run(&job, &ctx, controller.as_ref(), &cancel).await;
                self.abort.disarm();
                result
            }
        };

        if result.outcome.is_terminal() || !job.plugin.needs_verification() {
            return self.finish(&job, result);
        }
        self.await_verification(&job, result)
    }

    fn state(&self) -> Result<&SessionState, AssistantError> {
        self.get_state().ok_or(AssistantError::NoSession)
    }

    fn finish(&mut self, job: &JobDefinition, state: JobState) -> Result<RunStep, AssistantError> {
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        session.record(job, state.clone())?;
        Ok(RunStep::Ran { job: job.id.clone(), state })
    }

    /// Manual outcome needed. Silent sessions answer from the launcher's
    /// `[manual]` table or skip; interactive ones wait for `verify`.
    fn await_verification(&mut self, job: &JobDefinition, mut result: JobState) -> Result<RunStep, AssistantError> {
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        if session.launcher.is_silent() {
            let (outcome, comment) = match session.launcher.manual_answer(&job.id) {
                Some(outcome) => (outcome, "answered by launcher configuration"),
                None => (Outcome::Skip, "no answer for manual job in a silent session"),
            };
            result.outcome = outcome;
            result.comments = Some(comment.to_string());
            return self.finish(job, result);
        }
        session.state.await_verification(job, result);
        session.checkpoint()?;
        info!(session = %session.state.id, job = %job.id, "awaiting verification");
        Ok(RunStep::AwaitingVerification { job: job.id.clone() })
    }

    /// Deliver the outcome of a job awaiting verification.
    pub fn verify(&mut self, id: &JobId, outcome: Outcome, comments: Option<String>) -> Result<JobState, AssistantError> {
        if !outcome.is_terminal() {
            return Err(AssistantError::InvalidVerdict(outcome));
        }
        let session = self.session.as_mut().ok_or(AssistantError::NoSession)?;
        if session.state.pending_verification.as_ref() != Some(id) {
            return Err(AssistantError::NotAwaitingVerification(id.clone()));
        }
        let job = self.units.job(id).cloned().unwrap_or_else(|| JobDefinition::new(id.clone(), Plugin::Manual));
        let mut state = session.state.job_state(id).cloned().unwrap_or_default();
        state.outcome = outcome;
        if comments.is_some() {
            state.comments = comments;
        }
        session.record(&job, state.clone())?;
        Ok(state)
    }

    /// Abort the current job.
    ///
    /// A running process group is killed and the job fails with `aborted`
    /// once `run_next` returns. A job awaiting verification fails right away.
    /// Returns whether there was anything to abort.
    pub fn abort(&mut self) -> Result<bool, AssistantError> {
        if self.abort.abort() {
            return Ok(true);
        }
        let pending = self.state()?.pending_verification.clone();
        match pending {
            Some(id) => {
                self.verify(&id, Outcome::Fail, Some(ABORTED.to_string()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Make a persisted session the active one.
    ///
    /// Definitions generated during bootstrap are rebuilt, results recorded
    /// against changed definitions are reset, and the in-flight job (if any)
    /// takes its result from the reboot handshake file or is offered again.
    pub fn resume(&mut self, id: &SessionId) -> Result<ResumeReport, AssistantError> {
        let storage = self.repo.open(id)?;
        let mut state = storage.load_checkpoint()?.ok_or_else(|| AssistantError::EmptySession(id.clone()))?;
        let launcher = if state.metadata.app_blob.is_empty() {
            LauncherConfig::default()
        } else {
            LauncherConfig::from_app_blob(&state.metadata.app_blob)?
        };

        let generated = merge_generated(&mut self.units, &state)?;
        debug!(session = %id, generated = generated.jobs.len(), "rebuilt generated jobs");

        let mut report = ResumeReport { stale: state.invalidate_stale(&self.units), ..ResumeReport::default() };
        if !report.stale.is_empty() {
            info!(session = %id, stale = ?report.stale, "definitions changed since last run");
        }

        if let Some(running) = state.metadata.running_job_id.clone() {
            if state.pending_verification.as_ref() != Some(&running) {
                let result_path = storage.share_dir().join(REBOOT_RESULT_FILE);
                match read_reboot_result(&result_path) {
                    Some(result) => {
                        let job = self
                            .units
                            .job(&running)
                            .cloned()
                            .unwrap_or_else(|| JobDefinition::new(running.clone(), Plugin::Shell));
                        let mut job_state = state.job_state(&running).cloned().unwrap_or_default();
                        job_state.outcome = result.outcome;
                        job_state.comments = result.comments;
                        state.record_result(&job, job_state);
                        if let Err(e) = fs::remove_file(&result_path) {
                            warn!(path = %result_path.display(), error = %e, "cannot remove reboot result");
                        }
                        report.recovered = Some(running);
                    }
                    None => {
                        state.metadata.running_job_id = None;
                        report.rerun = Some(running);
                    }
                }
            }
        }
        if state.next_job().is_some() || state.metadata.has_flag(FLAG_BOOTSTRAPPING) {
            state.metadata.set_flag(FLAG_INCOMPLETE, true);
        }

        let selector = ControllerSelector::for_launcher(&launcher, self.as_root);
        let session = ActiveSession { storage, state, launcher, selector, warmed_up: false };
        session.checkpoint()?;
        info!(session = %id, recovered = ?report.recovered, rerun = ?report.rerun, "session resumed");
        self.session = Some(session);
        Ok(report)
    }
}

fn read_reboot_result(path: &std::path::Path) -> Option<RebootResult> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice::<RebootResult>(&bytes) {
        Ok(result) if result.outcome.is_terminal() => Some(result),
        Ok(_) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed reboot result");
            None
        }
    }
}

#[cfg(test)]
#[path = "assistant_tests.rs"]
mod tests;
