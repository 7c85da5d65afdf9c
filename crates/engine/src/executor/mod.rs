// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor
//!
//! Runs one job through its controller and turns the exit status into a
//! `JobState`. Every failure here is scoped to the job: the caller always
//! gets a state back, never an error.

mod cache;
mod capture;

pub use cache::ResultCache;

use crate::controller::ExecutionController;
use capture::Mirror;
use ck_core::{
    delay_secs, Clock, JobDefinition, JobId, JobState, Outcome, Plugin, SessionId, SystemClock,
    FLAG_CACHABLE, FLAG_PRESERVE_CWD,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const ENV_SESSION_ID: &str = "CK_SESSION_ID";
pub const ENV_SESSION_SHARE: &str = "CK_SESSION_SHARE";
pub const ENV_JOB_ID: &str = "CK_JOB_ID";

/// Comment recorded on a job killed by an abort request.
pub const ABORTED: &str = "aborted";

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("No command to run!")]
    NoCommand(JobId),
    #[error("no execution controller can run job {0}")]
    NoController(JobId),
    #[error("warm-up of controller {controller} failed: {message}")]
    WarmUp { controller: &'static str, message: String },
    #[error("cannot start job: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-session facts every job execution needs.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub session_id: SessionId,
    /// Directory shared by all jobs of the session.
    pub share_dir: PathBuf,
    /// Where stdout/stderr mirrors go; `None` disables them.
    pub io_log_dir: Option<PathBuf>,
    /// Launcher `[environment]` values.
    pub environment: BTreeMap<String, String>,
    pub dry_run: bool,
}

impl ExecContext {
    /// Environment for `job`: the launcher values it asks for through
    /// `environ` (all of them when it lists none) plus the session variables.
    pub fn job_env(&self, job: &JobDefinition) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = self
            .environment
            .iter()
            .filter(|(key, _)| job.environ.is_empty() || job.environ.contains(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.insert(ENV_SESSION_ID.to_string(), self.session_id.to_string());
        env.insert(ENV_SESSION_SHARE.to_string(), self.share_dir.display().to_string());
        env.insert(ENV_JOB_ID.to_string(), job.id.to_string());
        env
    }
}

pub struct JobExecutor<C: Clock = SystemClock> {
    clock: C,
    cache: Option<ResultCache>,
}

impl<C: Clock> JobExecutor<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, cache: None }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run `job` and return its state.
    ///
    /// Jobs without a command (manual) come back undecided without running.
    /// Jobs that need confirmation run and come back undecided with their
    /// output attached; the outcome is decided by a later verification.
    pub async fn run(
        &self,
        job: &JobDefinition,
        ctx: &ExecContext,
        controller: &dyn ExecutionController,
        cancel: &CancellationToken,
    ) -> JobState {
        if !job.plugin.runs_command() {
            return JobState::default();
        }
        if ctx.dry_run && !matches!(job.plugin, Plugin::Resource | Plugin::Attachment) {
            return JobState::with_outcome(Outcome::Skip, "dry run");
        }

        let cachable = job.plugin == Plugin::Resource && job.has_flag(FLAG_CACHABLE);
        if cachable {
            if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(job)) {
                return hit;
            }
        }

        let started = self.clock.now();
        let mut state = match self.execute(job, ctx, controller, cancel).await {
            Ok(state) => state,
            Err(e) => {
                warn!(job = %job.id, error = %e, "job could not run");
                JobState::with_outcome(Outcome::Fail, e.to_string())
            }
        };
        state.execution_duration = Some(delay_secs(started, self.clock.now()));
        info!(
            job = %job.id,
            outcome = %state.outcome,
            return_code = ?state.return_code,
            "job finished"
        );

        if cachable && state.outcome == Outcome::Pass {
            if let Some(cache) = &self.cache {
                cache.put(job, &state);
            }
        }
        state
    }

    async fn execute(
        &self,
        job: &JobDefinition,
        ctx: &ExecContext,
        controller: &dyn ExecutionController,
        cancel: &CancellationToken,
    ) -> Result<JobState, ExecError> {
        let spec = controller.command(job, &ctx.job_env(job))?;

        // Held until the job exits; dropping it removes the directory.
        let scratch = if job.has_flag(FLAG_PRESERVE_CWD) {
            None
        } else {
            Some(tempfile::Builder::new().prefix("ck-job-").tempdir()?)
        };
        let cwd = match &scratch {
            Some(dir) => dir.path().to_path_buf(),
            None => std::env::current_dir()?,
        };

        info!(job = %job.id, controller = controller.name(), cwd = %cwd.display(), "running job");
        let mirror = Mirror::open(ctx.io_log_dir.as_deref(), &job.id);
        let captured = capture::run_captured(&spec, &cwd, self.clock.clone(), mirror, cancel).await?;
        let code = captured.return_code();
        let aborted = captured.aborted;
        let mut state = JobState::from_return_code(code, captured.io_log);

        if aborted {
            state.outcome = Outcome::Fail;
            state.comments = Some(ABORTED.to_string());
        } else if code < 0 {
            state.comments = Some(format!("job crashed (signal {})", -code));
        } else if job.plugin.needs_verification() {
            state.outcome = Outcome::Undecided;
        }
        Ok(state)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
