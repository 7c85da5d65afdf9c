// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod control;
pub mod run;
pub mod session;

use std::path::Path;

use anyhow::{Context, Result};
use ck_core::{JobId, LauncherConfig, SessionState, SystemClock, UnitStore};
use ck_daemon::Config;
use ck_engine::{JobExecutor, ResultCache, SessionAssistant};
use ck_storage::SessionRepository;

use crate::exit_error::ExitError;
use crate::output::{print_summary, OutputFormat};

/// Read a launcher file; no file means defaults.
pub fn load_launcher(path: Option<&Path>) -> Result<LauncherConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            LauncherConfig::parse(&text).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(LauncherConfig::default()),
    }
}

pub fn job_ids(raw: Vec<String>) -> Vec<JobId> {
    raw.into_iter().map(JobId::new).collect()
}

/// Assistant over the local state directory, as the agent would build it.
pub fn local_assistant(config: &Config) -> Result<SessionAssistant> {
    let units = if config.providers_dir.is_dir() {
        UnitStore::load_dir(&config.providers_dir)?
    } else {
        UnitStore::default()
    };
    let repo = SessionRepository::new(&config.state_dir)?;
    let executor = JobExecutor::new(SystemClock).with_cache(ResultCache::new(&config.cache_dir));
    Ok(SessionAssistant::new(units, repo, executor).with_root(config.as_root))
}

/// Print the summary and turn failed jobs into a nonzero exit.
pub fn finish(state: &SessionState, format: OutputFormat) -> Result<()> {
    let tally = print_summary(state, format)?;
    if tally.fail > 0 {
        return Err(ExitError::jobs_failed(tally.fail).into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
