// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ping = { Request::Ping, false },
    get_state = { Request::GetState, false },
    abort = { Request::Abort, true },
    next = { Request::RequestNextJob, true },
    resume = { Request::ResumeById { session_id: SessionId::new("ses-1") }, true },
    verify = { Request::Verify { job_id: JobId::new("ns::m"), outcome: Outcome::Pass, comments: None }, true },
    select = { Request::SelectJobs { job_ids: vec![JobId::new("ns::a")] }, true },
    rerun_candidates = { Request::GetRerunCandidates, false },
    rerun = { Request::Rerun { job_ids: vec![JobId::new("ns::a")] }, true },
)]
fn driving_requests(request: Request, drives: bool) {
    assert_eq!(request.drives_session(), drives);
}

#[test]
fn request_is_tagged_by_type() {
    let json = serde_json::to_value(Request::GetJobResult { job_id: JobId::new("ns::a") }).unwrap();
    assert_eq!(json, serde_json::json!({ "type": "GetJobResult", "job_id": "ns::a" }));
}

#[test]
fn start_new_jobs_default_to_empty() {
    let request: Request = serde_json::from_str(r#"{"type":"StartNew","launcher":{}}"#).unwrap();
    assert_eq!(request, Request::StartNew { launcher: Box::default(), jobs: Vec::new() });
}

#[test]
fn verify_outcome_uses_kebab_case() {
    let request: Request =
        serde_json::from_str(r#"{"type":"Verify","job_id":"ns::m","outcome":"not-supported"}"#).unwrap();
    assert_eq!(
        request,
        Request::Verify { job_id: JobId::new("ns::m"), outcome: Outcome::NotSupported, comments: None }
    );
}
