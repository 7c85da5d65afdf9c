// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ck control` - drive a session on a remote agent

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use ck_core::SessionId;
use ck_daemon::Config;
use ck_wire::DEFAULT_PORT;
use clap::{Args, Subcommand};

use super::{finish, job_ids, load_launcher};
use crate::client::AgentClient;
use crate::controller::{Controller, ControllerError, SessionMarker, Start};
use crate::exit_error::{ExitError, EXIT_RESUME_AMBIGUOUS, EXIT_UNREACHABLE};
use crate::output::{print_job, print_sessions, OutputFormat};
use crate::prompt::LineVerifier;

#[derive(Args)]
pub struct ControlArgs {
    /// Agent address: host or host:port (default port 18871)
    pub agent: String,
    #[command(subcommand)]
    pub command: ControlCommand,
}

#[derive(Subcommand)]
pub enum ControlCommand {
    /// Start a new session on the agent and drive it
    Start {
        /// Launcher configuration file (TOML)
        #[arg(short, long)]
        launcher: Option<PathBuf>,
        /// Jobs to run when the launcher names no test plan
        jobs: Vec<String>,
        /// Once bootstrap is over, run only these jobs and their prerequisites
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },
    /// Resume a stored session on the agent and drive it
    Resume {
        /// Session ID
        id: String,
    },
    /// Continue the session this controller was driving
    Continue,
    /// List resumable sessions on the agent
    List,
    /// Delete sessions on the agent
    Delete {
        /// Session IDs
        ids: Vec<String>,
    },
    /// Abort the running job, or fail the job awaiting verification
    Abort,
    /// List jobs that did not pass, or send the named ones back for another attempt
    Rerun {
        /// Job IDs; none lists the candidates
        jobs: Vec<String>,
    },
    /// Show the result of a job in the active session
    Result {
        /// Job ID
        job: String,
    },
    /// Check that the agent answers
    Ping,
}

/// Resolve `host[:port]`, defaulting the port.
pub fn agent_addr(agent: &str) -> Result<SocketAddr> {
    if let Ok(addr) = agent.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = agent.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }
    let with_port = if agent.contains(':') { agent.to_string() } else { format!("{agent}:{DEFAULT_PORT}") };
    with_port
        .to_socket_addrs()
        .with_context(|| format!("resolving {agent}"))?
        .next()
        .ok_or_else(|| anyhow!("no address for {agent}"))
}

pub async fn handle(args: ControlArgs, format: OutputFormat) -> Result<()> {
    let addr = agent_addr(&args.agent)?;
    let mut only = Vec::new();
    let start = match args.command {
        ControlCommand::Start { launcher, jobs, only: selection } => {
            only = job_ids(selection);
            Start::New { launcher: Box::new(load_launcher(launcher.as_deref())?), jobs: job_ids(jobs) }
        }
        ControlCommand::Resume { id } => Start::Resume(SessionId::new(id)),
        ControlCommand::Continue => Start::Continue,
        command => return one_shot(addr, command, format).await,
    };

    let config = Config::load()?;
    let marker = SessionMarker::for_agent(&config.state_dir, addr);
    tracing::debug!(marker = %marker.path().display(), "controller session marker");
    let mut controller =
        Controller::new(addr, marker, LineVerifier::stdin()).with_selection(only).on_result(move |job, state| {
            if let Err(e) = print_job(job, state, format) {
                eprintln!("{e}");
            }
        });
    match controller.run(start).await {
        Ok(state) => finish(&state, format),
        Err(e) => Err(exit_for(e).into()),
    }
}

fn exit_for(e: ControllerError) -> ExitError {
    let code = match &e {
        ControllerError::ResumeAmbiguity { .. } | ControllerError::NothingToContinue(_) => EXIT_RESUME_AMBIGUOUS,
        ControllerError::Unreachable { .. } => EXIT_UNREACHABLE,
        _ => 1,
    };
    ExitError::new(code, e.to_string())
}

async fn one_shot(addr: SocketAddr, command: ControlCommand, format: OutputFormat) -> Result<()> {
    let mut client = AgentClient::connect(addr).await?;
    match command {
        ControlCommand::List => print_sessions(&client.list_resumable().await?, format)?,
        ControlCommand::Delete { ids } => {
            let count = client.delete_sessions(ids.into_iter().map(SessionId::new).collect()).await?;
            println!("Deleted {count} session(s)");
        }
        ControlCommand::Abort => {
            if client.abort().await? {
                println!("Aborted");
            } else {
                println!("Nothing to abort");
            }
        }
        ControlCommand::Rerun { jobs } if jobs.is_empty() => {
            for id in client.rerun_candidates().await? {
                println!("{id}");
            }
        }
        ControlCommand::Rerun { jobs } => {
            let requeued = client.rerun(job_ids(jobs)).await?;
            println!("Requeued {} job(s); continue the session to run them", requeued.len());
        }
        ControlCommand::Result { job } => {
            let job = ck_core::JobId::new(job);
            match client.get_job_result(&job).await? {
                Some(state) => print_job(&job, &state, format)?,
                None => return Err(ExitError::new(1, format!("no result for {job}")).into()),
            }
        }
        ControlCommand::Ping => {
            client.ping().await?;
            println!("pong from {}", client.addr());
        }
        ControlCommand::Start { .. } | ControlCommand::Resume { .. } | ControlCommand::Continue => {}
    }
    Ok(())
}
