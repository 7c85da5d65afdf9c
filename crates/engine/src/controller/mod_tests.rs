// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ck_core::test_support::{manual_job, shell_job};

fn env() -> BTreeMap<String, String> {
    BTreeMap::from([("CK_JOB_ID".to_string(), "ns::a".to_string()), ("LANG".to_string(), "C".to_string())])
}

#[test]
fn shell_spec_exports_env() {
    let spec = UserController::new().command(&shell_job("ns::a", "echo hi"), &env()).unwrap();
    assert_eq!(spec.program, "sh");
    assert_eq!(spec.args, vec!["-c", "echo hi"]);
    assert_eq!(spec.env, env());
}

#[test]
fn sudo_spec_passes_env_as_arguments() {
    let spec = SudoController.command(&shell_job("ns::a", "id -u"), &env()).unwrap();
    assert_eq!(spec.program, "sudo");
    assert_eq!(spec.args, vec!["-n", "env", "CK_JOB_ID=ns::a", "LANG=C", "sh", "-c", "id -u"]);
    assert!(spec.env.is_empty());
}

#[test]
fn trusted_launcher_addresses_job_by_checksum() {
    let job = JobDefinition::builder().id("ns::a").user(Some("root".to_string())).build();
    let spec = TrustedLauncherController::new("/opt/ck/launcher").command(&job, &env()).unwrap();
    assert_eq!(spec.program, "/opt/ck/launcher");
    assert_eq!(
        spec.args,
        vec![
            "--target".to_string(),
            "root".to_string(),
            "--checksum".to_string(),
            job.checksum(),
            "--env".to_string(),
            "CK_JOB_ID=ns::a".to_string(),
            "--env".to_string(),
            "LANG=C".to_string(),
        ]
    );
}

#[test]
fn missing_command_is_an_error() {
    let job = manual_job("ns::m");
    for controller in [
        &UserController::new() as &dyn ExecutionController,
        &RootController,
        &SudoController,
        &TrustedLauncherController::new("/bin/false"),
    ] {
        assert!(matches!(controller.command(&job, &env()), Err(ExecError::NoCommand(_))));
    }
}

#[yare::parameterized(
    user_plain = { "user", false, 1 },
    user_root = { "user", true, -1 },
    root_plain = { "root", false, -1 },
    root_root = { "root", true, 4 },
    sudo_root = { "sudo", true, 2 },
    launcher_root = { "trusted-launcher", true, 3 },
)]
fn scores(name: &str, needs_root: bool, expected: i32) {
    let controller: Box<dyn ExecutionController> = match name {
        "user" => Box::new(UserController::new()),
        "root" => Box::new(RootController),
        "sudo" => Box::new(SudoController),
        _ => Box::new(TrustedLauncherController::new("/bin/true")),
    };
    let job = JobDefinition::builder().id("ns::a").user(needs_root.then(|| "root".to_string())).build();
    assert_eq!(controller.score(&job), expected);
}

#[tokio::test]
async fn warm_up_reports_failing_command() {
    let err = TrustedLauncherController::new("/bin/false").warm_up().await.unwrap_err();
    assert!(matches!(err, ExecError::WarmUp { controller: "trusted-launcher", .. }));
}

#[tokio::test]
async fn warm_up_succeeds_on_zero_exit() {
    TrustedLauncherController::new("/bin/true").warm_up().await.unwrap();
    UserController::new().warm_up().await.unwrap();
}
