// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ck list` / `ck delete` - sessions stored on this machine

use anyhow::Result;
use ck_core::SessionId;
use ck_daemon::Config;
use ck_storage::SessionRepository;

use crate::output::{print_sessions, OutputFormat};

pub fn list(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let repo = SessionRepository::new(&config.state_dir)?;
    print_sessions(&repo.resume_candidates()?, format)
}

pub fn delete(ids: Vec<String>) -> Result<()> {
    let config = Config::load()?;
    let repo = SessionRepository::new(&config.state_dir)?;
    let ids: Vec<SessionId> = ids.into_iter().map(SessionId::new).collect();
    let removed = repo.delete(&ids)?;
    println!("Deleted {removed} session(s)");
    Ok(())
}
