// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ck run` / `ck resume` - run a session on this machine

use std::path::PathBuf;

use anyhow::{bail, Result};
use ck_core::{JobDefinition, JobId, Plugin, SessionId, SessionState};
use ck_daemon::Config;
use ck_engine::{RunStep, SessionAssistant};
use clap::Args;
use tracing::info;

use super::{finish, job_ids, load_launcher, local_assistant};
use crate::output::{print_job, OutputFormat};
use crate::prompt::{LineVerifier, Verifier};

#[derive(Args)]
pub struct RunArgs {
    /// Launcher configuration file (TOML)
    #[arg(short, long)]
    pub launcher: Option<PathBuf>,
    /// Directory of unit files (default: $CK_PROVIDERS or <state>/providers)
    #[arg(long)]
    pub providers: Option<PathBuf>,
    /// Jobs to run when the launcher names no test plan
    pub jobs: Vec<String>,
}

pub async fn handle(args: RunArgs, format: OutputFormat) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(providers) = args.providers {
        config.providers_dir = providers;
    }
    let launcher = load_launcher(args.launcher.as_deref())?;
    let planned = launcher.test_plan.unit.is_some();
    if !planned && args.jobs.is_empty() {
        bail!("nothing to run: name jobs or a test plan in the launcher");
    }

    let mut assistant = local_assistant(&config)?;
    let session = assistant.start_session(launcher)?;
    if !planned {
        assistant.resolve(&job_ids(args.jobs))?;
    }
    info!(session = %session, "running locally");
    drive(&mut assistant, format).await
}

pub async fn resume(session: String, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let mut assistant = local_assistant(&config)?;
    let report = assistant.resume(&SessionId::new(session))?;
    if !report.stale.is_empty() {
        eprintln!("{} job(s) changed since the session was saved and will run again", report.stale.len());
    }
    if let Some(job) = &report.recovered {
        eprintln!("{job} finished across a reboot");
    }
    drive(&mut assistant, format).await
}

/// Run the active session to the end; Ctrl-C aborts the running job.
async fn drive(assistant: &mut SessionAssistant, format: OutputFormat) -> Result<()> {
    let abort = assistant.abort_handle();
    let interrupts = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if abort.abort() {
                eprintln!("aborting the running job");
            }
        }
    });

    let mut verifier = LineVerifier::stdin();
    let result = run_to_end(assistant, &mut verifier, format).await;
    interrupts.abort();
    finish(&result?, format)
}

pub(crate) async fn run_to_end(
    assistant: &mut SessionAssistant,
    verifier: &mut impl Verifier,
    format: OutputFormat,
) -> Result<SessionState> {
    loop {
        match assistant.run_next().await? {
            RunStep::Ran { job, state } => print_job(&job, &state, format)?,
            RunStep::AwaitingVerification { job } => {
                let definition = manual_definition(assistant, &job);
                let Some((outcome, comments)) = verifier.verify(&definition).await else {
                    bail!("no answer for {job}; resume the session to continue");
                };
                let state = assistant.verify(&job, outcome, comments)?;
                print_job(&job, &state, format)?;
            }
            RunStep::Finished => {
                let silent = assistant.launcher().is_some_and(|l| l.is_silent());
                let candidates = assistant.rerun_candidates()?;
                if silent || candidates.is_empty() {
                    break;
                }
                let chosen = verifier.choose_rerun(&candidates).await;
                if chosen.is_empty() {
                    break;
                }
                assistant.rerun(&chosen)?;
            }
        }
    }
    match assistant.get_state() {
        Some(state) => Ok(state.clone()),
        None => bail!("session vanished"),
    }
}

fn manual_definition(assistant: &SessionAssistant, job: &JobId) -> JobDefinition {
    assistant.units().job(job).cloned().unwrap_or_else(|| JobDefinition::new(job.clone(), Plugin::Manual))
}

