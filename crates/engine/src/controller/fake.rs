// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted controller for tests.

use super::{Capability, CommandSpec, ExecutionController};
use crate::executor::ExecError;
use async_trait::async_trait;
use ck_core::JobDefinition;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs every job with `sh -c`, at a fixed score, and counts warm-ups.
#[derive(Clone)]
pub struct FakeController {
    name: &'static str,
    score: i32,
    fail_warm_up: bool,
    warm_ups: Arc<Mutex<usize>>,
    commands: Arc<Mutex<Vec<CommandSpec>>>,
}

impl FakeController {
    pub fn new(name: &'static str, score: i32) -> Self {
        Self {
            name,
            score,
            fail_warm_up: false,
            warm_ups: Arc::new(Mutex::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_warm_up(mut self) -> Self {
        self.fail_warm_up = true;
        self
    }

    pub fn warm_ups(&self) -> usize {
        *self.warm_ups.lock()
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl ExecutionController for FakeController {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ExecuteShell]
    }

    fn score(&self, _job: &JobDefinition) -> i32 {
        self.score
    }

    fn command(&self, job: &JobDefinition, env: &BTreeMap<String, String>) -> Result<CommandSpec, ExecError> {
        let spec = CommandSpec::shell(super::job_command(job)?, env);
        self.commands.lock().push(spec.clone());
        Ok(spec)
    }

    async fn warm_up(&self) -> Result<(), ExecError> {
        *self.warm_ups.lock() += 1;
        if self.fail_warm_up {
            return Err(ExecError::WarmUp { controller: self.name, message: "scripted".to_string() });
        }
        Ok(())
    }
}
