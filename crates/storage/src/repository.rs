// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! All sessions under a state directory.

use ck_core::{ResumeCandidate, SessionId, FLAG_INCOMPLETE, FLAG_SUBMITTED};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

use crate::{SessionStorage, StorageError};

#[derive(Debug, Clone)]
pub struct SessionRepository {
    sessions_dir: PathBuf,
}

impl SessionRepository {
    pub fn new(state_dir: &Path) -> Result<Self, StorageError> {
        let sessions_dir = state_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn create(&self, id: &SessionId) -> Result<SessionStorage, StorageError> {
        SessionStorage::create(&self.sessions_dir, id)
    }

    pub fn open(&self, id: &SessionId) -> Result<SessionStorage, StorageError> {
        SessionStorage::open(&self.sessions_dir, id)
    }

    /// Ids of every stored session, newest checkpoint first.
    pub fn session_ids(&self) -> Result<Vec<SessionId>, StorageError> {
        let mut found: Vec<(SystemTime, SessionId)> = Vec::new();
        for entry in fs::read_dir(&self.sessions_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(SessionId::new) else {
                continue;
            };
            let mtime = fs::metadata(entry.path().join("session"))
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((mtime, name));
        }
        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }

    /// Sessions that can be resumed, newest first.
    ///
    /// A session is resumable while its `incomplete` flag is set and it was
    /// not submitted. Unreadable checkpoints are logged and skipped.
    pub fn resume_candidates(&self) -> Result<Vec<ResumeCandidate>, StorageError> {
        let mut candidates = Vec::new();
        for id in self.session_ids()? {
            let state = match self.open(&id).and_then(|s| s.load_checkpoint()) {
                Ok(Some(state)) => state,
                Ok(None) => continue,
                Err(e) => {
                    warn!(session = %id, error = %e, "skipping unreadable session");
                    continue;
                }
            };
            let meta = &state.metadata;
            if meta.has_flag(FLAG_INCOMPLETE) && !meta.has_flag(FLAG_SUBMITTED) {
                candidates.push(ResumeCandidate { session_id: id, metadata: state.metadata });
            }
        }
        Ok(candidates)
    }

    /// Delete the given sessions; unknown ids are ignored. Returns how many were removed.
    pub fn delete(&self, ids: &[SessionId]) -> Result<usize, StorageError> {
        let mut removed = 0;
        for id in ids {
            match self.open(id) {
                Ok(storage) => {
                    storage.remove()?;
                    removed += 1;
                }
                Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
