// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ck_core::test_support::shell_job;
use ck_core::{SessionId, SessionMetadata};
use serial_test::serial;

fn state_with(results: &[(&str, Outcome)], pending: &[&str]) -> SessionState {
    let mut state = SessionState::new(SessionId::new("ses-out"), SessionMetadata::default());
    let ids: Vec<JobId> = results.iter().map(|(id, _)| *id).chain(pending.iter().copied()).map(JobId::new).collect();
    state.set_run_list(ids.clone(), ids);
    for (id, outcome) in results {
        state.record_result(&shell_job(id, "true"), JobState::with_outcome(*outcome, ""));
    }
    state
}

#[test]
fn tally_counts_every_outcome() {
    let state = state_with(
        &[("a", Outcome::Pass), ("b", Outcome::Pass), ("c", Outcome::Fail), ("d", Outcome::NotSupported)],
        &["e"],
    );
    assert_eq!(Tally::of(&state), Tally { pass: 2, fail: 1, skip: 0, not_supported: 1, undecided: 1 });
}

#[test]
fn summary_mentions_optional_counts_only_when_present() {
    let plain = Tally { pass: 3, fail: 1, skip: 2, ..Tally::default() };
    assert_eq!(summary_line(&plain), "3 passed, 1 failed, 2 skipped");
    let full = Tally { not_supported: 1, undecided: 4, ..plain };
    assert_eq!(summary_line(&full), "3 passed, 1 failed, 2 skipped, 1 not supported, 4 not run");
}

#[test]
#[serial]
fn job_line_shows_comment() {
    std::env::set_var("NO_COLOR", "1");
    let line = job_line(&JobId::new("ns::a"), &JobState::with_outcome(Outcome::Fail, "aborted"));
    assert_eq!(line, "fail          ns::a  (aborted)");
    let line = job_line(&JobId::new("ns::b"), &JobState::with_outcome(Outcome::Pass, ""));
    assert_eq!(line, "pass          ns::b");
    std::env::remove_var("NO_COLOR");
}

#[test]
fn printing_does_not_fail() {
    let state = state_with(&[("a", Outcome::Pass)], &[]);
    assert!(print_summary(&state, OutputFormat::Json).is_ok());
    assert!(print_sessions(&[], OutputFormat::Text).is_ok());
    assert!(print_job(&JobId::new("a"), &JobState::default(), OutputFormat::Json).is_ok());
}
