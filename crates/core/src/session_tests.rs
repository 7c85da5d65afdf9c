// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::result::{IoLogRecord, IoStream};

fn job(id: &str) -> JobDefinition {
    JobDefinition::builder().id(id).build()
}

fn resource_job(id: &str) -> JobDefinition {
    JobDefinition::builder().id(id).plugin(Plugin::Resource).build()
}

fn stdout_state(outcome: Outcome, text: &str) -> JobState {
    JobState {
        outcome,
        io_log: vec![IoLogRecord { delay: 0.0, stream: IoStream::Stdout, data: text.as_bytes().to_vec() }],
        ..JobState::default()
    }
}

fn session_with(ids: &[&str]) -> SessionState {
    let mut session = SessionState::new(SessionId::new("ses-test"), SessionMetadata::default());
    let list: Vec<JobId> = ids.iter().map(|id| JobId::new(*id)).collect();
    session.set_run_list(list.clone(), list);
    session
}

#[test]
fn generated_ids_are_unique_and_prefixed() {
    let a = SessionId::generate();
    let b = SessionId::generate();
    assert_ne!(a, b);
    assert!(a.starts_with("ses-"));
}

#[test]
fn set_run_list_keeps_existing_results() {
    let mut session = session_with(&["a", "b"]);
    session.record_result(&job("a"), JobState::with_outcome(Outcome::Pass, "ok"));
    session.set_run_list(vec![], vec![JobId::new("a"), JobId::new("b"), JobId::new("c")]);
    assert_eq!(session.outcome(&JobId::new("a")), Outcome::Pass);
    assert_eq!(session.outcome(&JobId::new("c")), Outcome::Undecided);
}

#[test]
fn remaining_skips_terminal_jobs_in_order() {
    let mut session = session_with(&["a", "b", "c"]);
    session.record_result(&job("b"), JobState::with_outcome(Outcome::Skip, "dep failed"));
    let remaining: Vec<_> = session.remaining().map(|id| id.as_str()).collect();
    assert_eq!(remaining, vec!["a", "c"]);
    assert_eq!(session.next_job().map(|id| id.as_str()), Some("a"));
}

#[test]
fn mark_running_then_result_clears_running_job() {
    let mut session = session_with(&["a", "b"]);
    session.mark_running(&JobId::new("a"));
    assert_eq!(session.status(), SessionStatus::Running);
    assert!(session.metadata.has_flag(FLAG_INCOMPLETE));

    session.record_result(&job("a"), JobState::with_outcome(Outcome::Pass, ""));
    assert_eq!(session.metadata.running_job_id, None);
    assert_eq!(session.status(), SessionStatus::Incomplete);
}

#[test]
fn undecided_result_keeps_running_job() {
    let mut session = session_with(&["a"]);
    session.mark_running(&JobId::new("a"));
    session.record_result(&job("a"), JobState::default());
    assert_eq!(session.metadata.running_job_id, Some(JobId::new("a")));
}

#[test]
fn finishing_every_job_completes_session() {
    let mut session = session_with(&["a", "b"]);
    assert_eq!(session.status(), SessionStatus::Fresh);
    session.mark_running(&JobId::new("a"));
    session.record_result(&job("a"), JobState::with_outcome(Outcome::Pass, ""));
    session.mark_running(&JobId::new("b"));
    session.record_result(&job("b"), JobState::with_outcome(Outcome::Fail, ""));
    assert_eq!(session.status(), SessionStatus::Complete);
    assert!(!session.metadata.has_flag(FLAG_INCOMPLETE));
}

#[test]
fn passing_resource_job_stores_parsed_records() {
    let mut session = session_with(&["res"]);
    session.record_result(&resource_job("res"), stdout_state(Outcome::Pass, "name: x\n\nname: y\n"));
    let records = session.resources(&JobId::new("res")).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("name"), Some("y"));
}

#[test]
fn failed_resource_job_drops_records() {
    let mut session = session_with(&["res"]);
    session.record_result(&resource_job("res"), stdout_state(Outcome::Pass, "name: x\n"));
    session.record_result(&resource_job("res"), stdout_state(Outcome::Fail, "name: x\n"));
    assert!(session.resources(&JobId::new("res")).is_none());
}

#[test]
fn invalidate_stale_resets_changed_jobs_only() {
    let mut units = UnitStore::default();
    let res = resource_job("res");
    let other = job("other");
    units.add_job(res.clone()).unwrap();
    units.add_job(other.clone()).unwrap();

    let mut session = session_with(&["res", "other"]);
    session.record_result(&res, stdout_state(Outcome::Pass, "name: x\n"));
    session.record_result(&other, JobState::with_outcome(Outcome::Pass, ""));

    let mut changed = res.clone();
    changed.command = Some("echo name: y".to_string());
    let mut units2 = UnitStore::default();
    units2.add_job(changed).unwrap();
    units2.add_job(other).unwrap();

    assert!(session.invalidate_stale(&units).is_empty());
    let stale = session.invalidate_stale(&units2);
    assert_eq!(stale, vec![JobId::new("res")]);
    assert_eq!(session.outcome(&JobId::new("res")), Outcome::Undecided);
    assert_eq!(session.outcome(&JobId::new("other")), Outcome::Pass);
    assert!(session.resources(&JobId::new("res")).is_none());
    assert!(session.metadata.has_flag(FLAG_INCOMPLETE));
}

#[test]
fn retry_failed_requeues_until_attempts_run_out() {
    let mut session = session_with(&["a", "b"]);
    session.record_result(&job("a"), JobState::with_outcome(Outcome::Fail, "boom"));
    session.record_result(&job("b"), JobState::with_outcome(Outcome::Pass, ""));
    assert!(!session.metadata.has_flag(FLAG_INCOMPLETE));

    assert_eq!(session.retry_failed(3), vec![JobId::new("a")]);
    assert_eq!(session.outcome(&JobId::new("a")), Outcome::Undecided);
    assert!(session.metadata.has_flag(FLAG_INCOMPLETE));

    session.record_result(&job("a"), JobState::with_outcome(Outcome::Fail, "boom"));
    assert_eq!(session.retry_failed(3), vec![JobId::new("a")]);
    session.record_result(&job("a"), JobState::with_outcome(Outcome::Fail, "boom"));
    assert!(session.retry_failed(3).is_empty());
    assert_eq!(session.retries.get(&JobId::new("a")), Some(&2));
}

#[test]
fn single_attempt_never_retries() {
    let mut session = session_with(&["a"]);
    session.record_result(&job("a"), JobState::with_outcome(Outcome::Fail, "boom"));
    assert!(session.retry_failed(1).is_empty());
}

#[test]
fn awaiting_verification_is_not_running() {
    let mut session = session_with(&["m", "b"]);
    session.mark_running(&JobId::new("m"));
    session.await_verification(&job("m"), JobState::default());

    assert_eq!(session.metadata.running_job_id, None);
    assert_eq!(session.pending_verification, Some(JobId::new("m")));
    assert_eq!(session.status(), SessionStatus::Fresh);
    assert!(session.metadata.has_flag(FLAG_INCOMPLETE));

    session.record_result(&job("m"), JobState::with_outcome(Outcome::Pass, ""));
    assert_eq!(session.pending_verification, None);
    assert_eq!(session.status(), SessionStatus::Incomplete);
}

#[test]
fn rerun_candidates_are_decided_jobs_that_did_not_pass() {
    let mut session = session_with(&["a", "b", "c", "d", "e"]);
    session.record_result(&job("a"), JobState::with_outcome(Outcome::Pass, ""));
    session.record_result(&job("b"), JobState::with_outcome(Outcome::Fail, ""));
    session.record_result(&job("c"), JobState::with_outcome(Outcome::Skip, ""));
    session.record_result(&job("d"), JobState::with_outcome(Outcome::NotSupported, ""));
    let ids: Vec<JobId> = ["b", "c", "d"].into_iter().map(JobId::new).collect();
    assert_eq!(session.rerun_candidates(), ids);
}

#[test]
fn requeue_counts_attempts_and_reopens_the_session() {
    let mut session = session_with(&["res"]);
    session.record_result(&resource_job("res"), stdout_state(Outcome::Fail, "name: x\n"));
    assert!(!session.metadata.has_flag(FLAG_INCOMPLETE));

    session.requeue(&[JobId::new("res")]);
    assert_eq!(session.next_job(), Some(&JobId::new("res")));
    assert_eq!(session.retries.get(&JobId::new("res")), Some(&1));
    assert!(session.metadata.has_flag(FLAG_INCOMPLETE));
}

#[test]
fn retain_jobs_keeps_decided_jobs_and_order() {
    let mut session = session_with(&["boot", "a", "b", "c"]);
    session.record_result(&job("boot"), JobState::with_outcome(Outcome::Pass, ""));

    session.retain_jobs(vec![JobId::new("c")], |id| id.as_str() == "a" || id.as_str() == "c");
    let run_list: Vec<&str> = session.run_list.iter().map(JobId::as_str).collect();
    assert_eq!(run_list, ["boot", "a", "c"]);
    assert_eq!(session.desired_job_list, vec![JobId::new("c")]);
    assert!(session.metadata.has_flag(FLAG_INCOMPLETE));

    session.retain_jobs(Vec::new(), |_| false);
    assert_eq!(session.run_list, vec![JobId::new("boot")]);
    assert!(!session.metadata.has_flag(FLAG_INCOMPLETE));
}

#[test]
fn without_io_logs_keeps_outcomes_and_resources() {
    let mut session = session_with(&["res"]);
    session.record_result(&resource_job("res"), stdout_state(Outcome::Pass, "name: x\n"));
    let slim = session.without_io_logs();
    assert!(slim.job_state(&JobId::new("res")).unwrap().io_log.is_empty());
    assert_eq!(slim.outcome(&JobId::new("res")), Outcome::Pass);
    assert_eq!(slim.resources(&JobId::new("res")), session.resources(&JobId::new("res")));
    assert_eq!(session.job_state(&JobId::new("res")).unwrap().stdout(), b"name: x\n");
}

#[test]
fn session_state_survives_json() {
    let mut session = session_with(&["res"]);
    session.record_result(&resource_job("res"), stdout_state(Outcome::Pass, "name: x\n"));
    let json = serde_json::to_string(&session).unwrap();
    let back: SessionState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, session);
}

#[yare::parameterized(
    generated = { "ses-Ab_9-x", true },
    dotted = { "lab.2", true },
    empty = { "", false },
    hidden = { ".x", false },
    parent = { "..", false },
    slash = { "a/b", false },
    backslash = { "a\\b", false },
    space = { "a b", false },
)]
fn session_id_validity(id: &str, valid: bool) {
    assert_eq!(SessionId::new(id).is_valid(), valid);
}

#[test]
fn generated_session_ids_are_valid() {
    assert!(SessionId::generate().is_valid());
}
