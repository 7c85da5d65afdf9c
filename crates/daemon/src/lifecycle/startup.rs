// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent startup and initialization logic.

use std::sync::Arc;

use ck_core::{SystemClock, UnitStore};
use ck_engine::{JobExecutor, ResultCache, SessionAssistant};
use ck_storage::SessionRepository;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{Config, LifecycleError, StartupResult};
use crate::agent::{Agent, Driver};
use crate::autopilot::silent_candidate;

/// Start the agent
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Bind FIRST: a second agent must fail before touching any session
    let listener =
        TcpListener::bind(config.socket_addr()).await.map_err(|e| LifecycleError::BindFailed(config.port, e))?;

    // 2. Create directories
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.cache_dir)?;

    // 3. Load units
    let units = if config.providers_dir.is_dir() {
        UnitStore::load_dir(&config.providers_dir)?
    } else {
        warn!(dir = %config.providers_dir.display(), "providers directory missing; no units loaded");
        UnitStore::default()
    };
    info!(jobs = units.len(), "units loaded");

    // 4. Build the assistant
    let repo = SessionRepository::new(&config.state_dir)?;
    let executor = JobExecutor::new(SystemClock).with_cache(ResultCache::new(&config.cache_dir));
    let mut assistant = SessionAssistant::new(units, repo, executor).with_root(config.as_root);

    // 5. Resume an unfinished silent session, if any
    let candidates = assistant.list_resumable()?;
    let autopilot = match silent_candidate(&candidates) {
        Some(candidate) => {
            let id = candidate.session_id.clone();
            let report = assistant.resume(&id)?;
            info!(
                session = %id,
                stale = report.stale.len(),
                recovered = ?report.recovered,
                rerun = ?report.rerun,
                "resumed silent session"
            );
            Some(id)
        }
        None => None,
    };

    let agent = Arc::new(Agent::new(assistant));
    if autopilot.is_some() {
        agent.acquire(Driver::Autopilot);
    }

    info!(addr = %config.socket_addr(), "agent started");
    Ok(StartupResult { agent, listener, autopilot })
}
