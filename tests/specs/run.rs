// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local run specs

use crate::prelude::*;

const UNITS: &str = r#"
[[job]]
id = "ns::resource"
plugin = "resource"
command = "echo 'name: x'"

[[job]]
id = "ns::a"
plugin = "shell"
command = "true"
requires = ["resource.name == 'x'"]

[[job]]
id = "ns::b"
plugin = "shell"
command = "true"
requires = ["resource.name == 'y'"]
"#;

#[test]
fn unmet_requirement_is_not_supported_rather_than_failed() {
    let project = Project::empty();
    project.file("providers/units.toml", UNITS);
    let out = project.ck().args(&["run", "ns::a", "ns::b"]).passes().stdout();

    let lines: Vec<&str> = out.lines().filter(|l| l.contains("ns::")).collect();
    assert!(lines[0].starts_with("pass") && lines[0].contains("ns::resource"), "{out}");
    assert!(lines[1].starts_with("pass") && lines[1].contains("ns::a"), "{out}");
    assert!(lines[2].starts_with("not-supported") && lines[2].contains("ns::b"), "{out}");
    assert!(out.contains("1 not supported"), "{out}");
}

#[test]
fn failed_job_exits_with_jobs_failed() {
    let project = Project::empty();
    project.file("providers/units.toml", "[[job]]\nid = \"ns::bad\"\nplugin = \"shell\"\ncommand = \"exit 7\"\n");
    let result = project.ck().args(&["run", "ns::bad"]).fails().stderr_has("1 job(s) failed");
    assert_eq!(result.code(), Some(2));
}

#[test]
fn interrupted_session_is_listed_and_resumed() {
    let project = Project::empty();
    project.file("providers/units.toml", "[[job]]\nid = \"ns::m\"\nplugin = \"manual\"\n");

    // No answer on stdin: the run stops at the manual job
    project.ck().args(&["run", "ns::m"]).fails();
    let listed = project.ck().args(&["list", "-o", "json"]).passes().stdout();
    let sessions: serde_json::Value = serde_json::from_str(&listed).unwrap();
    let id = sessions[0]["session_id"].as_str().unwrap().to_string();

    let mut resume = project.ck().args(&["resume", &id]).into_command();
    resume.stdin(std::process::Stdio::piped()).stdout(std::process::Stdio::piped());
    let mut child = resume.spawn().unwrap();
    {
        use std::io::Write;
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"pass\n\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ns::m"));

    project.ck().args(&["delete", &id]).passes().stdout_has("Deleted 1 session(s)");
}

#[test]
fn operator_can_rerun_a_failed_job_before_the_run_ends() {
    let project = Project::empty();
    project.file(
        "providers/units.toml",
        "[[job]]\nid = \"ns::flaky\"\nplugin = \"shell\"\n\
         command = 'f=\"$CK_SESSION_SHARE/seen\"; [ -f \"$f\" ] && exit 0; touch \"$f\"; exit 1'\n",
    );

    let mut run = project.ck().args(&["run", "ns::flaky"]).into_command();
    run.stdin(std::process::Stdio::piped()).stdout(std::process::Stdio::piped());
    let mut child = run.spawn().unwrap();
    {
        use std::io::Write;
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"all\n").unwrap();
    }
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");
    let lines: Vec<&str> = stdout.lines().filter(|l| l.contains("ns::flaky")).collect();
    assert!(lines[0].starts_with("fail") && lines[1].starts_with("pass"), "{stdout}");
}
