// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests that operate on the assistant.

use ck_core::{JobDefinition, JobId, LauncherConfig, Outcome, Plugin, SessionId};
use ck_engine::{ResumeReport, RunStep};
use ck_wire::{Response, ResumeSummary};
use tracing::info;

use super::error_response;
use crate::agent::Agent;

pub(super) async fn start(agent: &Agent, launcher: LauncherConfig, jobs: &[JobId]) -> Response {
    let mut assistant = agent.assistant().await;
    let result = assistant.start_session(launcher).and_then(|session_id| {
        let planned = assistant.launcher().is_some_and(|l| l.test_plan.unit.is_some());
        if !planned {
            assistant.resolve(jobs)?;
        }
        Ok(session_id)
    });
    agent.publish(&assistant);
    match result {
        Ok(session_id) => {
            let run_list = assistant.get_state().map(|s| s.run_list.clone()).unwrap_or_default();
            info!(session = %session_id, jobs = run_list.len(), "session started for controller");
            Response::SessionStarted { session_id, run_list }
        }
        Err(e) => error_response(e),
    }
}

pub(super) async fn resume(agent: &Agent, session_id: &SessionId) -> Response {
    let mut assistant = agent.assistant().await;
    let result = assistant.resume(session_id);
    agent.publish(&assistant);
    match result {
        Ok(report) => Response::Resumed { session_id: session_id.clone(), summary: summary(report) },
        Err(e) => error_response(e),
    }
}

fn summary(report: ResumeReport) -> ResumeSummary {
    ResumeSummary { stale: report.stale, recovered: report.recovered, rerun: report.rerun }
}

pub(super) async fn next_job(agent: &Agent) -> Response {
    let mut assistant = agent.assistant().await;
    let step = assistant.run_next().await;
    agent.publish(&assistant);
    match step {
        Ok(RunStep::Ran { job, state }) => Response::JobFinished { job_id: job, result: state },
        Ok(RunStep::AwaitingVerification { job }) => {
            let definition =
                assistant.units().job(&job).cloned().unwrap_or_else(|| JobDefinition::new(job, Plugin::Manual));
            Response::AwaitingVerification { job: Box::new(definition) }
        }
        Ok(RunStep::Finished) => match assistant.session_id() {
            Some(session_id) => Response::SessionFinished { session_id: session_id.clone() },
            None => error_response("no active session"),
        },
        Err(e) => error_response(e),
    }
}

pub(super) async fn verify(agent: &Agent, job_id: &JobId, outcome: Outcome, comments: Option<String>) -> Response {
    let mut assistant = agent.assistant().await;
    let result = assistant.verify(job_id, outcome, comments);
    agent.publish(&assistant);
    match result {
        Ok(state) => Response::JobFinished { job_id: job_id.clone(), result: state },
        Err(e) => error_response(e),
    }
}

pub(super) async fn select(agent: &Agent, job_ids: &[JobId]) -> Response {
    let mut assistant = agent.assistant().await;
    let result = assistant.select_jobs(job_ids);
    agent.publish(&assistant);
    match result {
        Ok(run_list) => Response::JobsSelected { run_list },
        Err(e) => error_response(e),
    }
}

pub(super) async fn rerun(agent: &Agent, job_ids: &[JobId]) -> Response {
    let mut assistant = agent.assistant().await;
    let result = assistant.rerun(job_ids);
    agent.publish(&assistant);
    match result {
        Ok(job_ids) => {
            info!(jobs = ?job_ids, "jobs requeued by controller");
            Response::Requeued { job_ids }
        }
        Err(e) => error_response(e),
    }
}

/// Kill the running job without waiting for the assistant; otherwise fail
/// the job awaiting verification.
pub(super) async fn abort(agent: &Agent) -> Response {
    if agent.abort_handle().abort() {
        return Response::Aborted { aborted: true };
    }
    let mut assistant = agent.assistant().await;
    let result = assistant.abort();
    agent.publish(&assistant);
    match result {
        Ok(aborted) => Response::Aborted { aborted },
        Err(e) => error_response(e),
    }
}
