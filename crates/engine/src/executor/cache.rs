// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Results of `cachable` resource jobs, keyed by job checksum.

use ck_core::{JobDefinition, JobState};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, job: &JobDefinition) -> PathBuf {
        self.dir.join(format!("{}.json", job.checksum()))
    }

    /// Cached result for this exact definition. Unreadable entries are misses.
    pub fn get(&self, job: &JobDefinition) -> Option<JobState> {
        let path = self.path(job);
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => {
                debug!(job = %job.id, "resource served from cache");
                Some(state)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Store a result; failures are logged and otherwise ignored.
    pub fn put(&self, job: &JobDefinition, state: &JobState) {
        let write = || -> Result<(), Box<dyn std::error::Error>> {
            fs::create_dir_all(&self.dir)?;
            let tmp = self.path(job).with_extension("tmp");
            fs::write(&tmp, serde_json::to_vec(state)?)?;
            fs::rename(&tmp, self.path(job))?;
            Ok(())
        };
        if let Err(e) = write() {
            warn!(job = %job.id, error = %e, "cannot cache resource result");
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
