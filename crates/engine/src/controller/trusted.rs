// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{run_warm_up, Capability, CommandSpec, ExecutionController, CANNOT_RUN};
use crate::executor::ExecError;
use async_trait::async_trait;
use ck_core::JobDefinition;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Runs root jobs through the external privileged launcher.
///
/// The launcher looks the job up by checksum itself; no command text
/// crosses the privilege boundary:
///
/// ```text
/// <launcher> --target root --checksum <sha256> [--env K=V ...]
/// ```
#[derive(Debug, Clone)]
pub struct TrustedLauncherController {
    launcher: PathBuf,
}

impl TrustedLauncherController {
    pub fn new(launcher: impl Into<PathBuf>) -> Self {
        Self { launcher: launcher.into() }
    }

    fn program(&self) -> String {
        self.launcher.display().to_string()
    }
}

#[async_trait]
impl ExecutionController for TrustedLauncherController {
    fn name(&self) -> &'static str {
        "trusted-launcher"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ExecuteShell, Capability::ExecuteAsRoot]
    }

    fn score(&self, job: &JobDefinition) -> i32 {
        if job.needs_root() {
            3
        } else {
            CANNOT_RUN
        }
    }

    fn command(&self, job: &JobDefinition, env: &BTreeMap<String, String>) -> Result<CommandSpec, ExecError> {
        if job.command().is_none() {
            return Err(ExecError::NoCommand(job.id.clone()));
        }
        let target = job.user.clone().unwrap_or_else(|| "root".to_string());
        let mut args = vec!["--target".to_string(), target, "--checksum".to_string(), job.checksum()];
        for (key, value) in env {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }
        Ok(CommandSpec { program: self.program(), args, env: BTreeMap::new() })
    }

    async fn warm_up(&self) -> Result<(), ExecError> {
        run_warm_up(self.name(), &self.program(), &["--warm-up"]).await
    }
}
