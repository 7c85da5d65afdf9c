// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and controller specs

use std::process::Stdio;
use std::time::Duration;

use crate::prelude::*;

const UNITS: &str = r#"
[[job]]
id = "ns::slow"
plugin = "shell"
command = "sleep 3"

[[job]]
id = "ns::after"
plugin = "shell"
command = "echo done"
after = ["ns::slow"]
"#;

const SILENT: &str = "[ui]\ntype = \"silent\"\n";

#[test]
fn agent_on_a_used_port_exits_nonzero() {
    let project = Project::empty();
    let taken = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let port = taken.local_addr().unwrap().port();
    project.ckd(port).fails().stderr_has("Failed to bind port");
}

#[test]
fn agent_answers_ping() {
    let project = Project::empty();
    let port = free_port();
    let _agent = project.spawn_agent(port);
    project.ck().args(&["control", &format!("127.0.0.1:{port}"), "ping"]).passes().stdout_has("pong");
}

#[test]
fn controller_follows_silent_session_across_agent_restart() {
    let project = Project::empty();
    project.file("providers/units.toml", UNITS);
    let launcher = project.file("silent.toml", SILENT);
    let port = free_port();
    let agent = project.spawn_agent(port);

    let mut controller = project
        .ck()
        .args(&["control", &format!("127.0.0.1:{port}"), "start", "--launcher"])
        .args(&[launcher.to_str().unwrap(), "ns::slow", "ns::after"])
        .into_command();
    controller.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut controller = controller.spawn().unwrap();

    // Reboot the target while ns::slow runs
    std::thread::sleep(Duration::from_millis(1500));
    agent.kill();
    let _agent = project.spawn_agent(port);

    let finished = wait_for(SPEC_WAIT_MAX_MS * 2, || controller.try_wait().unwrap().is_some());
    if !finished {
        controller.kill().ok();
    }
    let output = controller.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(finished, "controller did not finish:\n{stdout}");
    assert!(output.status.success(), "stdout:\n{stdout}\nstderr:\n{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("ns::slow") && stdout.contains("ns::after"), "{stdout}");
}
