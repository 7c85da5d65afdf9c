// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution controllers
//!
//! A controller decides how a job's command is started: directly as the
//! invoking user, through `sudo`, directly as root, or through the external
//! trusted launcher. Each controller scores every job; the
//! [`ControllerSelector`] picks the best one.
//!
//! ```text
//! score  controller         jobs
//!   4    root               user = root, agent already root
//!   3    trusted-launcher   user = root, launcher configured
//!   2    sudo               user = root
//!   1    user               everything else
//! ```

mod root;
mod selector;
mod sudo;
mod trusted;
mod user;

pub use root::RootController;
pub use selector::{running_as_root, ControllerSelector};
pub use sudo::SudoController;
pub use trusted::TrustedLauncherController;
pub use user::UserController;

#[cfg(test)]
mod fake;
#[cfg(test)]
pub use fake::FakeController;

use crate::executor::ExecError;
use async_trait::async_trait;
use ck_core::JobDefinition;
use std::collections::BTreeMap;
use std::process::Stdio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ExecuteShell,
    ExecuteAsRoot,
    InteractiveUi,
    ExecuteQml,
}

ck_core::simple_display! {
    Capability {
        ExecuteShell => "can-execute-shell",
        ExecuteAsRoot => "can-execute-as-root",
        InteractiveUi => "can-present-interactive-ui",
        ExecuteQml => "can-execute-qml",
    }
}

/// Score meaning "cannot run this job".
pub const CANNOT_RUN: i32 = -1;

/// Program and arguments for one job execution.
///
/// `env` is applied on top of the inherited environment. Controllers that
/// cross a privilege boundary pass the job environment through `env(1)`
/// arguments instead, since `sudo` and the launcher reset it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// `sh -c <command>` with `env` exported.
    pub fn shell(command: &str, env: &BTreeMap<String, String>) -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), command.to_string()],
            env: env.clone(),
        }
    }

    /// `sudo -n [-u user] env K=V... sh -c <command>`
    pub fn sudo(user: Option<&str>, command: &str, env: &BTreeMap<String, String>) -> Self {
        let mut args = vec!["-n".to_string()];
        if let Some(user) = user {
            args.push("-u".to_string());
            args.push(user.to_string());
        }
        args.push("env".to_string());
        args.extend(env.iter().map(|(k, v)| format!("{k}={v}")));
        args.extend(["sh".to_string(), "-c".to_string(), command.to_string()]);
        Self { program: "sudo".to_string(), args, env: BTreeMap::new() }
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        cmd
    }
}

#[async_trait]
pub trait ExecutionController: Send + Sync {
    /// Stable name, used for logs and to deduplicate warm-ups.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> &'static [Capability];

    /// How well this controller fits `job`; negative means it cannot run it.
    fn score(&self, job: &JobDefinition) -> i32;

    /// Build the command for `job` with its execution environment.
    fn command(&self, job: &JobDefinition, env: &BTreeMap<String, String>) -> Result<CommandSpec, ExecError>;

    /// Prepare for a run list using this controller (e.g. cache credentials).
    async fn warm_up(&self) -> Result<(), ExecError> {
        Ok(())
    }
}

/// The job's command, or the job-scoped "no command" error.
pub(crate) fn job_command(job: &JobDefinition) -> Result<&str, ExecError> {
    job.command().ok_or_else(|| ExecError::NoCommand(job.id.clone()))
}

/// Run a warm-up command to completion with no output captured.
pub(crate) async fn run_warm_up(controller: &'static str, program: &str, args: &[&str]) -> Result<(), ExecError> {
    let status = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| ExecError::WarmUp { controller, message: e.to_string() })?;
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::WarmUp { controller, message: format!("{program} exited with {status}") })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
