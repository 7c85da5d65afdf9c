// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{job_command, run_warm_up, Capability, CommandSpec, ExecutionController, CANNOT_RUN};
use crate::executor::ExecError;
use async_trait::async_trait;
use ck_core::JobDefinition;
use std::collections::BTreeMap;

/// Runs root jobs through non-interactive `sudo`.
#[derive(Debug, Clone, Default)]
pub struct SudoController;

#[async_trait]
impl ExecutionController for SudoController {
    fn name(&self) -> &'static str {
        "sudo"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ExecuteShell, Capability::ExecuteAsRoot]
    }

    fn score(&self, job: &JobDefinition) -> i32 {
        if job.needs_root() {
            2
        } else {
            CANNOT_RUN
        }
    }

    fn command(&self, job: &JobDefinition, env: &BTreeMap<String, String>) -> Result<CommandSpec, ExecError> {
        Ok(CommandSpec::sudo(None, job_command(job)?, env))
    }

    async fn warm_up(&self) -> Result<(), ExecError> {
        run_warm_up(self.name(), "sudo", &["-v"]).await
    }
}
