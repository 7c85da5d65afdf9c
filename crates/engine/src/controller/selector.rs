// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{
    ExecutionController, RootController, SudoController, TrustedLauncherController, UserController,
};
use crate::executor::ExecError;
use ck_core::{JobDefinition, LauncherConfig};
use std::sync::Arc;
use tracing::debug;

/// Whether this process runs with an effective uid of 0.
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Registry of controllers in registration order.
#[derive(Clone, Default)]
pub struct ControllerSelector {
    controllers: Vec<Arc<dyn ExecutionController>>,
}

impl ControllerSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard registry for a launcher configuration.
    pub fn for_launcher(config: &LauncherConfig, as_root: bool) -> Self {
        let mut selector = Self::new();
        match (&config.execution.normal_user, as_root) {
            (Some(user), true) => selector.register(Arc::new(UserController::run_as(user.clone()))),
            _ => selector.register(Arc::new(UserController::new())),
        }
        if as_root {
            selector.register(Arc::new(RootController));
        }
        if let Some(launcher) = &config.execution.trusted_launcher {
            selector.register(Arc::new(TrustedLauncherController::new(launcher)));
        }
        if !as_root {
            selector.register(Arc::new(SudoController));
        }
        selector
    }

    pub fn register(&mut self, controller: Arc<dyn ExecutionController>) {
        self.controllers.push(controller);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }

    /// Highest-scoring controller for `job`; the earliest registered wins ties.
    pub fn select(&self, job: &JobDefinition) -> Result<Arc<dyn ExecutionController>, ExecError> {
        let mut best: Option<(i32, &Arc<dyn ExecutionController>)> = None;
        for controller in &self.controllers {
            let score = controller.score(job);
            if score < 0 {
                continue;
            }
            if !matches!(best, Some((top, _)) if top >= score) {
                best = Some((score, controller));
            }
        }
        match best {
            Some((score, controller)) => {
                debug!(job = %job.id, controller = controller.name(), score, "selected controller");
                Ok(Arc::clone(controller))
            }
            None => Err(ExecError::NoController(job.id.clone())),
        }
    }

    /// Controllers used by `jobs`, each once, in order of first use.
    ///
    /// Jobs nothing can run are left out; they fail when their turn comes.
    pub fn warm_up_sequence<'a>(
        &self,
        jobs: impl IntoIterator<Item = &'a JobDefinition>,
    ) -> Vec<Arc<dyn ExecutionController>> {
        let mut out: Vec<Arc<dyn ExecutionController>> = Vec::new();
        for job in jobs {
            if !job.plugin.runs_command() {
                continue;
            }
            let Ok(controller) = self.select(job) else { continue };
            if !out.iter().any(|c| c.name() == controller.name()) {
                out.push(controller);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
