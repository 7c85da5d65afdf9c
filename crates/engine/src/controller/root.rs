// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{job_command, Capability, CommandSpec, ExecutionController, CANNOT_RUN};
use crate::executor::ExecError;
use async_trait::async_trait;
use ck_core::JobDefinition;
use std::collections::BTreeMap;

/// Runs root jobs directly; only registered when the agent is root.
#[derive(Debug, Clone, Default)]
pub struct RootController;

#[async_trait]
impl ExecutionController for RootController {
    fn name(&self) -> &'static str {
        "root"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ExecuteShell, Capability::ExecuteAsRoot, Capability::InteractiveUi]
    }

    fn score(&self, job: &JobDefinition) -> i32 {
        if job.needs_root() {
            4
        } else {
            CANNOT_RUN
        }
    }

    fn command(&self, job: &JobDefinition, env: &BTreeMap<String, String>) -> Result<CommandSpec, ExecError> {
        Ok(CommandSpec::shell(job_command(job)?, env))
    }
}
