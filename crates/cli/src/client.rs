// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to an agent.

use std::net::SocketAddr;
use std::time::Duration;

use ck_core::{JobDefinition, JobId, JobState, LauncherConfig, Outcome, ResumeCandidate, SessionId, SessionState};
use ck_wire::{self as wire, ProtocolError, Request, Response, ResumeSummary, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

/// Timeout for requests answered without running anything.
const QUICK_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// Consecutive failed pings before a long request is given up on.
const MISSED_HEARTBEATS: u32 = 3;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach agent at {addr}: {source}")]
    Connect { addr: SocketAddr, source: std::io::Error },
    #[error("connection to agent lost: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("agent is busy with session {}", .0.as_ref().map(|s| s.as_str()).unwrap_or("(none)"))]
    Busy(Option<SessionId>),
    #[error("agent error: {0}")]
    Rejected(String),
    #[error("unexpected response: {0:?}")]
    Unexpected(Box<Response>),
}

impl ClientError {
    /// Whether the agent went away, as opposed to refusing the request.
    pub fn is_unreachable(&self) -> bool {
        match self {
            ClientError::Connect { .. } => true,
            ClientError::Protocol(e) => e.is_disconnect() || matches!(e, ProtocolError::Timeout),
            _ => false,
        }
    }
}

/// Agent greeting.
#[derive(Debug, Clone, PartialEq)]
pub struct Greeting {
    pub version: String,
    pub active_session: Option<SessionId>,
    pub autopilot: bool,
}

/// What `request_next_job` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum NextJob {
    Finished { job_id: JobId, result: JobState },
    NeedsVerification(Box<JobDefinition>),
    SessionDone(SessionId),
}

pub struct AgentClient {
    addr: SocketAddr,
    stream: TcpStream,
}

impl AgentClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ClientError::Connect { addr, source }),
            Err(_) => return Err(ProtocolError::Timeout.into()),
        };
        stream.set_nodelay(true).ok();
        debug!(%addr, "connected to agent");
        Ok(Self { addr, stream })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send one request and wait for its response.
    ///
    /// Requests that run jobs get no read deadline; the agent is pinged on a
    /// side connection instead, so a target that vanished without closing
    /// the socket is still noticed.
    pub async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        wire::write_request(&mut self.stream, request, QUICK_TIMEOUT).await?;
        let response = if request.is_long_running() {
            let addr = self.addr;
            tokio::select! {
                response = wire::read_response(&mut self.stream, None) => response?,
                lost = heartbeat(addr) => return Err(lost),
            }
        } else {
            wire::read_response(&mut self.stream, Some(QUICK_TIMEOUT)).await?
        };
        match response {
            Response::Busy { session_id } => Err(ClientError::Busy(session_id)),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            response => Ok(response),
        }
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        Err(ClientError::Unexpected(Box::new(response)))
    }

    pub async fn hello(&mut self) -> Result<Greeting, ClientError> {
        match self.send(&Request::Hello { version: PROTOCOL_VERSION.to_string() }).await? {
            Response::Hello { version, active_session, autopilot } => {
                Ok(Greeting { version, active_session, autopilot })
            }
            other => Self::reject(other),
        }
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn list_resumable(&mut self) -> Result<Vec<ResumeCandidate>, ClientError> {
        match self.send(&Request::ListResumable).await? {
            Response::Sessions { sessions } => Ok(sessions),
            other => Self::reject(other),
        }
    }

    pub async fn resume(&mut self, session_id: &SessionId) -> Result<ResumeSummary, ClientError> {
        match self.send(&Request::ResumeById { session_id: session_id.clone() }).await? {
            Response::Resumed { summary, .. } => Ok(summary),
            other => Self::reject(other),
        }
    }

    pub async fn start_new(
        &mut self,
        launcher: LauncherConfig,
        jobs: Vec<JobId>,
    ) -> Result<(SessionId, Vec<JobId>), ClientError> {
        match self.send(&Request::StartNew { launcher: Box::new(launcher), jobs }).await? {
            Response::SessionStarted { session_id, run_list } => Ok((session_id, run_list)),
            other => Self::reject(other),
        }
    }

    pub async fn get_state(&mut self) -> Result<Option<SessionState>, ClientError> {
        match self.send(&Request::GetState).await? {
            Response::State { state } => Ok(state.map(|s| *s)),
            other => Self::reject(other),
        }
    }

    pub async fn get_job_result(&mut self, job_id: &JobId) -> Result<Option<JobState>, ClientError> {
        match self.send(&Request::GetJobResult { job_id: job_id.clone() }).await? {
            Response::JobResult { result, .. } => Ok(result),
            other => Self::reject(other),
        }
    }

    pub async fn request_next_job(&mut self) -> Result<NextJob, ClientError> {
        match self.send(&Request::RequestNextJob).await? {
            Response::JobFinished { job_id, result } => Ok(NextJob::Finished { job_id, result }),
            Response::AwaitingVerification { job } => Ok(NextJob::NeedsVerification(job)),
            Response::SessionFinished { session_id } => Ok(NextJob::SessionDone(session_id)),
            other => Self::reject(other),
        }
    }

    pub async fn verify(
        &mut self,
        job_id: &JobId,
        outcome: Outcome,
        comments: Option<String>,
    ) -> Result<JobState, ClientError> {
        match self.send(&Request::Verify { job_id: job_id.clone(), outcome, comments }).await? {
            Response::JobFinished { result, .. } => Ok(result),
            other => Self::reject(other),
        }
    }

    pub async fn abort(&mut self) -> Result<bool, ClientError> {
        match self.send(&Request::Abort).await? {
            Response::Aborted { aborted } => Ok(aborted),
            other => Self::reject(other),
        }
    }

    pub async fn select_jobs(&mut self, job_ids: Vec<JobId>) -> Result<Vec<JobId>, ClientError> {
        match self.send(&Request::SelectJobs { job_ids }).await? {
            Response::JobsSelected { run_list } => Ok(run_list),
            other => Self::reject(other),
        }
    }

    pub async fn rerun_candidates(&mut self) -> Result<Vec<JobId>, ClientError> {
        match self.send(&Request::GetRerunCandidates).await? {
            Response::RerunCandidates { job_ids } => Ok(job_ids),
            other => Self::reject(other),
        }
    }

    /// Returns every requeued job, prerequisites included.
    pub async fn rerun(&mut self, job_ids: Vec<JobId>) -> Result<Vec<JobId>, ClientError> {
        match self.send(&Request::Rerun { job_ids }).await? {
            Response::Requeued { job_ids } => Ok(job_ids),
            other => Self::reject(other),
        }
    }

    pub async fn delete_sessions(&mut self, session_ids: Vec<SessionId>) -> Result<usize, ClientError> {
        match self.send(&Request::DeleteSessions { session_ids }).await? {
            Response::Deleted { count } => Ok(count),
            other => Self::reject(other),
        }
    }
}

/// One ping on a fresh connection.
async fn try_connect(addr: SocketAddr) -> Result<(), ClientError> {
    let mut client = AgentClient::connect(addr).await?;
    wire::write_request(&mut client.stream, &Request::Ping, QUICK_TIMEOUT).await?;
    match wire::read_response(&mut client.stream, Some(QUICK_TIMEOUT)).await? {
        Response::Pong => Ok(()),
        other => AgentClient::reject(other),
    }
}

/// Ping the agent until it stops answering.
async fn heartbeat(addr: SocketAddr) -> ClientError {
    let mut missed = 0;
    loop {
        tokio::time::sleep(HEARTBEAT_INTERVAL).await;
        match try_connect(addr).await {
            Ok(()) => missed = 0,
            Err(e) if e.is_unreachable() => {
                missed += 1;
                debug!(%addr, missed, error = %e, "agent missed a heartbeat");
                if missed >= MISSED_HEARTBEATS {
                    return e;
                }
            }
            Err(e) => debug!(%addr, error = %e, "heartbeat answered oddly"),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
