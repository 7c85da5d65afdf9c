// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller: drives a session on a remote agent.
//!
//! The agent may disappear at any time (most often because a job rebooted
//! the target). The controller then retries with backoff and continues the
//! session it was driving. The only session it continues is the one recorded
//! in its marker file; anything else is a hard error.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ck_core::{JobId, JobState, LauncherConfig, ResumeCandidate, SessionId, SessionState, FLAG_BOOTSTRAPPING};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::client::{AgentClient, ClientError, Greeting, NextJob};
use crate::prompt::Verifier;

const ATTACH_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("agent at {addr} unreachable for {}s, giving up", .after.as_secs())]
    Unreachable { addr: SocketAddr, after: Duration },
    #[error("cannot continue session {session}: {reason}")]
    ResumeAmbiguity { session: SessionId, reason: String },
    #[error("no session recorded for agent {0}; start one first")]
    NothingToContinue(SocketAddr),
    #[error("no answer for manual job {0}")]
    NoVerdict(JobId),
    #[error("session marker {path}: {source}")]
    Marker { path: PathBuf, source: std::io::Error },
}

/// How to pick up a session after reconnecting.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconnect {
    /// The agent runs the session on its own; follow along until it stops.
    Attach,
    /// The session is active on the agent; keep requesting jobs.
    Drive,
    /// The agent lists the session as resumable.
    Resume,
    Ambiguous(String),
}

/// Decide how to continue `mine` from what the agent reports.
pub fn plan_reconnect(mine: &SessionId, greeting: &Greeting, resumable: &[ResumeCandidate]) -> Reconnect {
    match &greeting.active_session {
        Some(active) if active == mine => {
            if greeting.autopilot {
                Reconnect::Attach
            } else {
                Reconnect::Drive
            }
        }
        Some(other) if greeting.autopilot => {
            Reconnect::Ambiguous(format!("agent is running session {other} on its own"))
        }
        _ if resumable.iter().any(|c| &c.session_id == mine) => Reconnect::Resume,
        _ => Reconnect::Ambiguous("the agent does not list it as resumable".to_string()),
    }
}

/// On-disk record of the session a controller drives on one agent.
#[derive(Debug, Clone)]
pub struct SessionMarker {
    path: PathBuf,
}

impl SessionMarker {
    pub fn for_agent(state_dir: &Path, addr: SocketAddr) -> Self {
        let name = format!("{}.session", addr.to_string().replace([':', '[', ']'], "_"));
        Self { path: state_dir.join("controller").join(name) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ControllerError {
        ControllerError::Marker { path: self.path.clone(), source }
    }

    pub fn load(&self) -> Result<Option<SessionId>, ControllerError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if !text.trim().is_empty() => Ok(Some(SessionId::new(text.trim()))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Write the id through a temporary file so a crash never leaves a torn marker.
    pub fn save(&self, id: &SessionId) -> Result<(), ControllerError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, format!("{id}\n")).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }

    pub fn clear(&self) -> Result<(), ControllerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

/// What the controller is asked to do.
#[derive(Debug, Clone)]
pub enum Start {
    New { launcher: Box<LauncherConfig>, jobs: Vec<JobId> },
    Resume(SessionId),
    /// Continue the session recorded in the marker.
    Continue,
}

/// Controller connection state.
enum State {
    Disconnected,
    Connected(AgentClient),
    Driving(AgentClient, SessionId),
}

pub struct Controller<V> {
    addr: SocketAddr,
    marker: SessionMarker,
    verifier: V,
    give_up_after: Duration,
    reported: BTreeSet<JobId>,
    /// Narrowed selection, applied as soon as bootstrap is over.
    selection: Option<Vec<JobId>>,
    on_result: Box<dyn FnMut(&JobId, &JobState) + Send>,
}

impl<V: Verifier> Controller<V> {
    pub fn new(addr: SocketAddr, marker: SessionMarker, verifier: V) -> Self {
        Self {
            addr,
            marker,
            verifier,
            give_up_after: crate::env::reconnect_timeout(),
            reported: BTreeSet::new(),
            selection: None,
            on_result: Box::new(|_, _| {}),
        }
    }

    #[cfg(test)]
    pub fn with_give_up_after(mut self, give_up_after: Duration) -> Self {
        self.give_up_after = give_up_after;
        self
    }

    /// Run only `jobs` (and what they need) out of the session's selection.
    pub fn with_selection(mut self, jobs: Vec<JobId>) -> Self {
        self.selection = (!jobs.is_empty()).then_some(jobs);
        self
    }

    /// Called once for every job result, live or caught up after an attach.
    pub fn on_result(mut self, f: impl FnMut(&JobId, &JobState) + Send + 'static) -> Self {
        self.on_result = Box::new(f);
        self
    }

    fn report(&mut self, job_id: &JobId, result: &JobState) {
        if result.outcome.is_terminal() && self.reported.insert(job_id.clone()) {
            (self.on_result)(job_id, result);
        }
    }

    /// Apply the pending selection unless bootstrap jobs are still to run.
    async fn apply_selection(&mut self, client: &mut AgentClient) -> Result<(), ControllerError> {
        let Some(selection) = self.selection.take() else { return Ok(()) };
        let state = client.get_state().await?;
        if state.is_some_and(|s| s.metadata.has_flag(FLAG_BOOTSTRAPPING) && s.next_job().is_some()) {
            self.selection = Some(selection);
            return Ok(());
        }
        let run_list = client.select_jobs(selection).await?;
        info!(jobs = run_list.len(), "selection applied");
        Ok(())
    }

    /// Offer the jobs that did not pass for another attempt.
    ///
    /// Returns whether anything was requeued.
    async fn offer_rerun(&mut self, client: &mut AgentClient) -> Result<bool, ControllerError> {
        let candidates = client.rerun_candidates().await?;
        if candidates.is_empty() {
            return Ok(false);
        }
        let chosen = self.verifier.choose_rerun(&candidates).await;
        if chosen.is_empty() {
            return Ok(false);
        }
        let requeued = client.rerun(chosen).await?;
        for id in &requeued {
            self.reported.remove(id);
        }
        info!(jobs = ?requeued, "rerunning jobs");
        Ok(!requeued.is_empty())
    }

    /// Run to the end of the session and return its final state.
    pub async fn run(&mut self, start: Start) -> Result<SessionState, ControllerError> {
        let mut state = State::Disconnected;
        let mut start = Some(start);
        loop {
            state = match state {
                State::Disconnected => State::Connected(self.connect().await?),
                State::Connected(mut client) => {
                    let step = match start.take() {
                        Some(start) => self.establish(&mut client, start).await,
                        None => self.reconnect(&mut client).await,
                    };
                    match step {
                        Ok(session) => State::Driving(client, session),
                        Err(e) if is_unreachable(&e) => {
                            warn!(error = %e, "agent lost while connecting");
                            State::Disconnected
                        }
                        Err(e) => return Err(e),
                    }
                }
                State::Driving(mut client, session) => match self.drive(&mut client, &session).await {
                    Ok(done) => return Ok(done),
                    Err(e) if is_unreachable(&e) => {
                        warn!(session = %session, error = %e, "agent lost, reconnecting");
                        State::Disconnected
                    }
                    Err(e) => return Err(e),
                },
            };
        }
    }

    /// Connect, retrying with backoff while the agent is unreachable.
    async fn connect(&self) -> Result<AgentClient, ControllerError> {
        let started = Instant::now();
        let mut backoff = Backoff::starting_at(started, self.give_up_after);
        loop {
            match AgentClient::connect(self.addr).await {
                Ok(client) => return Ok(client),
                Err(e) if e.is_unreachable() => match backoff.next_delay(Instant::now()) {
                    Some(delay) => {
                        debug!(addr = %self.addr, ?delay, error = %e, "agent unreachable");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(ControllerError::Unreachable { addr: self.addr, after: started.elapsed() })
                    }
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// First contact: start, resume or continue a session.
    async fn establish(&mut self, client: &mut AgentClient, start: Start) -> Result<SessionId, ControllerError> {
        let greeting = client.hello().await?;
        info!(addr = %client.addr(), agent = %greeting.version, "connected to agent");
        match start {
            Start::New { launcher, jobs } => {
                let (session, run_list) = client.start_new(*launcher, jobs).await?;
                self.marker.save(&session)?;
                info!(session = %session, jobs = run_list.len(), "session started");
                Ok(session)
            }
            Start::Resume(session) => {
                let summary = client.resume(&session).await?;
                self.marker.save(&session)?;
                info!(session = %session, ?summary, "session resumed");
                Ok(session)
            }
            Start::Continue => {
                let session = self.marker.load()?.ok_or(ControllerError::NothingToContinue(self.addr))?;
                self.pick_up(client, session, greeting).await
            }
        }
    }

    async fn reconnect(&mut self, client: &mut AgentClient) -> Result<SessionId, ControllerError> {
        let greeting = client.hello().await?;
        let session = self.marker.load()?.ok_or(ControllerError::NothingToContinue(self.addr))?;
        info!(session = %session, "agent is back");
        self.pick_up(client, session, greeting).await
    }

    async fn pick_up(
        &mut self,
        client: &mut AgentClient,
        session: SessionId,
        greeting: Greeting,
    ) -> Result<SessionId, ControllerError> {
        let resumable = client.list_resumable().await?;
        match plan_reconnect(&session, &greeting, &resumable) {
            Reconnect::Attach => {
                self.attach(client).await?;
                Ok(session)
            }
            Reconnect::Drive => Ok(session),
            Reconnect::Resume => {
                let summary = client.resume(&session).await?;
                info!(session = %session, ?summary, "session resumed");
                Ok(session)
            }
            Reconnect::Ambiguous(reason) => Err(ControllerError::ResumeAmbiguity { session, reason }),
        }
    }

    /// Follow a session the agent runs on its own until it hands over.
    async fn attach(&mut self, client: &mut AgentClient) -> Result<(), ControllerError> {
        info!("agent is running the session unattended; following");
        loop {
            if let Some(state) = client.get_state().await? {
                self.catch_up(&state);
            }
            if !client.hello().await?.autopilot {
                return Ok(());
            }
            tokio::time::sleep(ATTACH_POLL).await;
        }
    }

    fn catch_up(&mut self, state: &SessionState) {
        for id in &state.run_list {
            if let Some(result) = state.job_state(id) {
                self.report(id, result);
            }
        }
    }

    async fn drive(&mut self, client: &mut AgentClient, session: &SessionId) -> Result<SessionState, ControllerError> {
        loop {
            self.apply_selection(client).await?;
            match client.request_next_job().await? {
                NextJob::Finished { job_id, result } => self.report(&job_id, &result),
                NextJob::NeedsVerification(job) => {
                    let (outcome, comments) =
                        self.verifier.verify(&job).await.ok_or_else(|| ControllerError::NoVerdict(job.id.clone()))?;
                    let result = client.verify(&job.id, outcome, comments).await?;
                    self.report(&job.id, &result);
                }
                NextJob::SessionDone(done) => {
                    if &done != session {
                        warn!(expected = %session, finished = %done, "agent finished a different session");
                    }
                    if self.offer_rerun(client).await? {
                        continue;
                    }
                    let state = client.get_state().await?.ok_or_else(|| ControllerError::ResumeAmbiguity {
                        session: session.clone(),
                        reason: "agent has no state for it".to_string(),
                    })?;
                    self.catch_up(&state);
                    self.marker.clear()?;
                    info!(session = %session, "session finished");
                    return Ok(state);
                }
            }
        }
    }
}

fn is_unreachable(e: &ControllerError) -> bool {
    matches!(e, ControllerError::Client(c) if c.is_unreachable())
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
