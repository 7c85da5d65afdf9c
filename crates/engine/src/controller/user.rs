// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{job_command, Capability, CommandSpec, ExecutionController, CANNOT_RUN};
use crate::executor::ExecError;
use async_trait::async_trait;
use ck_core::JobDefinition;
use std::collections::BTreeMap;

/// Runs unprivileged jobs with `sh -c`.
///
/// When the agent itself runs as root and a normal user is configured,
/// jobs drop to that user through `sudo -u`.
#[derive(Debug, Clone, Default)]
pub struct UserController {
    run_as: Option<String>,
}

impl UserController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_as(user: impl Into<String>) -> Self {
        Self { run_as: Some(user.into()) }
    }
}

#[async_trait]
impl ExecutionController for UserController {
    fn name(&self) -> &'static str {
        "user"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ExecuteShell, Capability::InteractiveUi]
    }

    fn score(&self, job: &JobDefinition) -> i32 {
        if job.needs_root() {
            CANNOT_RUN
        } else {
            1
        }
    }

    fn command(&self, job: &JobDefinition, env: &BTreeMap<String, String>) -> Result<CommandSpec, ExecError> {
        let command = job_command(job)?;
        Ok(match &self.run_as {
            Some(user) => CommandSpec::sudo(Some(user), command, env),
            None => CommandSpec::shell(command, env),
        })
    }
}
