// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface specs

use crate::prelude::*;

#[test]
fn ck_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("control");
}

#[test]
fn ck_control_help_shows_subcommands() {
    cli().args(&["control", "--help"]).passes().stdout_has("start").stdout_has("continue").stdout_has("abort").stdout_has("rerun");
}

#[test]
fn ck_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn ck_without_command_fails() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn list_on_fresh_state_is_empty() {
    let project = Project::empty();
    project.ck().args(&["list"]).passes().stdout_has("No resumable sessions");
}

#[test]
fn continue_without_a_recorded_session_is_ambiguous() {
    let project = Project::empty();
    let port = free_port();
    let _agent = project.spawn_agent(port);
    let result = project.ck().args(&["control", &format!("127.0.0.1:{port}"), "continue"]).fails();
    assert_eq!(result.code(), Some(3));
}
