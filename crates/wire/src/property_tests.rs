// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde roundtrips of every request and response variant.

use ck_core::test_support::shell_job;
use ck_core::{
    JobId, JobState, LauncherConfig, Outcome, ResumeCandidate, SessionId, SessionMetadata, SessionState,
};
use proptest::prelude::*;

use super::*;

fn sid() -> SessionId {
    SessionId::new("ses-1")
}

fn jid() -> JobId {
    JobId::new("ns::a")
}

fn all_requests() -> Vec<Request> {
    vec![
        Request::Hello { version: PROTOCOL_VERSION.to_string() },
        Request::Ping,
        Request::ListResumable,
        Request::ResumeById { session_id: sid() },
        Request::StartNew { launcher: Box::new(LauncherConfig::default()), jobs: vec![jid()] },
        Request::GetState,
        Request::GetJobResult { job_id: jid() },
        Request::RequestNextJob,
        Request::Verify { job_id: jid(), outcome: Outcome::Fail, comments: Some("broken".to_string()) },
        Request::Abort,
        Request::DeleteSessions { session_ids: vec![sid()] },
        Request::SelectJobs { job_ids: vec![jid()] },
        Request::GetRerunCandidates,
        Request::Rerun { job_ids: vec![jid()] },
    ]
}

fn all_responses() -> Vec<Response> {
    let state = SessionState::new(sid(), SessionMetadata::default());
    vec![
        Response::Ok,
        Response::Pong,
        Response::Hello { version: PROTOCOL_VERSION.to_string(), active_session: Some(sid()), autopilot: true },
        Response::Error { message: "nope".to_string() },
        Response::Busy { session_id: Some(sid()) },
        Response::Sessions {
            sessions: vec![ResumeCandidate { session_id: sid(), metadata: SessionMetadata::default() }],
        },
        Response::SessionStarted { session_id: sid(), run_list: vec![jid()] },
        Response::Resumed { session_id: sid(), summary: ResumeSummary { rerun: Some(jid()), ..Default::default() } },
        Response::State { state: Some(Box::new(state)) },
        Response::JobResult { job_id: jid(), result: None },
        Response::JobFinished { job_id: jid(), result: JobState::with_outcome(Outcome::Pass, "ok") },
        Response::AwaitingVerification { job: Box::new(shell_job("ns::a", "true")) },
        Response::SessionFinished { session_id: sid() },
        Response::Aborted { aborted: false },
        Response::Deleted { count: 2 },
        Response::JobsSelected { run_list: vec![jid()] },
        Response::RerunCandidates { job_ids: vec![jid()] },
        Response::Requeued { job_ids: Vec::new() },
    ]
}

proptest! {
    #[test]
    fn request_roundtrip(idx in 0..14usize) {
        let requests = all_requests();
        let request = &requests[idx % requests.len()];
        let bytes = encode(request).unwrap();
        let back: Request = decode(&bytes).unwrap();
        prop_assert_eq!(&back, request);
    }

    #[test]
    fn response_roundtrip(idx in 0..18usize) {
        let responses = all_responses();
        let response = &responses[idx % responses.len()];
        let bytes = encode(response).unwrap();
        let back: Response = decode(&bytes).unwrap();
        prop_assert_eq!(&back, response);
    }
}
