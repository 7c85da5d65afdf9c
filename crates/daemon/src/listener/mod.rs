// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for controller connections.
//!
//! Each accepted connection gets its own task and carries any number of
//! request/response pairs. A connection that drives the active session
//! keeps the driving lock until it closes.

mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use ck_wire::{self as wire, ProtocolError, Request, Response, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, ConnectionId, Driver};
use crate::env::ipc_timeout;

/// Listener task for accepting controller connections.
pub struct Listener {
    tcp: TcpListener,
    agent: Arc<Agent>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Listener {
    pub fn new(tcp: TcpListener, agent: Arc<Agent>) -> Self {
        Self { tcp, agent }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) {
        loop {
            match self.tcp.accept().await {
                Ok((stream, addr)) => {
                    let agent = Arc::clone(&self.agent);
                    let id = agent.connection_id();
                    debug!(connection = id, %addr, "controller connected");
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        let result = handle_connection(reader, writer, id, &agent).await;
                        agent.release(Driver::Connection(id));
                        if let Err(e) = result {
                            log_connection_error(id, e);
                        }
                    });
                }
                Err(e) => error!("TCP accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(id: ConnectionId, e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ref p) if p.is_disconnect() => {
            debug!(connection = id, "controller disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => {
            warn!(connection = id, "connection timeout")
        }
        _ => error!(connection = id, "connection error: {}", e),
    }
}

/// Serve one connection until the controller hangs up.
///
/// Requests are read without a deadline: a controller may sit idle while its
/// user inspects a manual job.
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    id: ConnectionId,
    agent: &Agent,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let bytes = wire::read_message(&mut reader).await?;
        let request: Request = wire::decode(&bytes)?;

        // Polling requests at debug level, the rest at info
        if matches!(request, Request::Ping | Request::GetState | Request::GetJobResult { .. }) {
            debug!(connection = id, request = ?request, "received request");
        } else {
            info!(connection = id, request = ?request, "received request");
        }

        let response = handle_request(request, id, agent).await;
        debug!(connection = id, "sending response");
        wire::write_response(&mut writer, &response, ipc_timeout()).await?;
    }
}

/// Handle a single request and return a response.
async fn handle_request(request: Request, id: ConnectionId, agent: &Agent) -> Response {
    if request.drives_session() && !agent.acquire(Driver::Connection(id)) {
        return Response::Busy { session_id: agent.active_session() };
    }

    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(connection = id, controller = %version, agent = PROTOCOL_VERSION, "protocol version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
                active_session: agent.active_session(),
                autopilot: agent.autopilot(),
            }
        }

        Request::ListResumable => match agent.repository().resume_candidates() {
            Ok(sessions) => Response::Sessions { sessions },
            Err(e) => error_response(e),
        },

        Request::GetState => Response::State { state: agent.snapshot().map(|s| Box::new(s.without_io_logs())) },

        Request::GetRerunCandidates => {
            Response::RerunCandidates { job_ids: agent.snapshot().map(|s| s.rerun_candidates()).unwrap_or_default() }
        }

        Request::GetJobResult { job_id } => {
            let result = agent.snapshot().and_then(|s| s.job_state(&job_id).cloned());
            Response::JobResult { job_id, result }
        }

        Request::DeleteSessions { session_ids } => {
            let active = agent.active_session();
            let ids: Vec<_> = session_ids.into_iter().filter(|s| Some(s) != active.as_ref()).collect();
            match agent.repository().delete(&ids) {
                Ok(count) => Response::Deleted { count },
                Err(e) => error_response(e),
            }
        }

        Request::Abort => session::abort(agent).await,
        Request::ResumeById { session_id } => session::resume(agent, &session_id).await,
        Request::StartNew { launcher, jobs } => session::start(agent, *launcher, &jobs).await,
        Request::RequestNextJob => session::next_job(agent).await,
        Request::Verify { job_id, outcome, comments } => {
            session::verify(agent, &job_id, outcome, comments).await
        }
        Request::SelectJobs { job_ids } => session::select(agent, &job_ids).await,
        Request::Rerun { job_ids } => session::rerun(agent, &job_ids).await,
    }
}

fn error_response(e: impl std::fmt::Display) -> Response {
    Response::Error { message: e.to_string() }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
