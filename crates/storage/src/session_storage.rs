// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk storage of one session.
//!
//! ```text
//! <sessions>/<session-id>/
//!   session        current checkpoint
//!   session.next   in-flight write, renamed over `session`
//!   share/         CK_SESSION_SHARE for jobs
//!   io-logs/       per-job stdout/stderr mirrors
//! ```

use ck_core::{SessionId, SessionState};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::checkpoint::{rotate_bak_path, Checkpoint};
use crate::StorageError;

const SESSION_FILE: &str = "session";
const NEXT_FILE: &str = "session.next";

/// Ids arrive over the wire; only plain directory names are accepted.
fn session_dir(sessions_dir: &Path, id: &SessionId) -> Result<PathBuf, StorageError> {
    if !id.is_valid() {
        return Err(StorageError::InvalidId(id.clone()));
    }
    Ok(sessions_dir.join(id.as_str()))
}

#[derive(Debug, Clone)]
pub struct SessionStorage {
    id: SessionId,
    dir: PathBuf,
}

impl SessionStorage {
    /// Create the directory layout for a new session.
    pub fn create(sessions_dir: &Path, id: &SessionId) -> Result<Self, StorageError> {
        let dir = session_dir(sessions_dir, id)?;
        if dir.join(SESSION_FILE).exists() {
            return Err(StorageError::AlreadyExists(id.clone()));
        }
        fs::create_dir_all(dir.join("share"))?;
        fs::create_dir_all(dir.join("io-logs"))?;
        Ok(Self { id: id.clone(), dir })
    }

    /// Open an existing session directory.
    pub fn open(sessions_dir: &Path, id: &SessionId) -> Result<Self, StorageError> {
        let dir = session_dir(sessions_dir, id)?;
        if !dir.is_dir() {
            return Err(StorageError::NotFound(id.clone()));
        }
        fs::create_dir_all(dir.join("share"))?;
        fs::create_dir_all(dir.join("io-logs"))?;
        Ok(Self { id: id.clone(), dir })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Directory shared by all jobs of the session.
    pub fn share_dir(&self) -> PathBuf {
        self.dir.join("share")
    }

    pub fn io_log_dir(&self) -> PathBuf {
        self.dir.join("io-logs")
    }

    /// Load the last checkpoint, or `None` if the session was never saved.
    ///
    /// An undecodable checkpoint is moved aside to `session.bak` and reported.
    pub fn load_checkpoint(&self) -> Result<Option<SessionState>, StorageError> {
        let path = self.checkpoint_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match Checkpoint::decode(&bytes) {
            Ok(checkpoint) => Ok(Some(checkpoint.state)),
            Err(e) => {
                let bak = rotate_bak_path(&path);
                warn!(session = %self.id, error = %e, bak = %bak.display(), "corrupt checkpoint, moving aside");
                fs::rename(&path, &bak)?;
                Err(StorageError::Corrupt { path, bak, reason: e.to_string() })
            }
        }
    }

    /// Atomically replace the checkpoint.
    ///
    /// The new checkpoint is written to `session.next` (created exclusively),
    /// synced, renamed over `session`, and the directory is synced.
    pub fn save_checkpoint(&self, state: &SessionState) -> Result<(), StorageError> {
        let data = Checkpoint::new(state.clone()).encode()?;
        let next = self.dir.join(NEXT_FILE);
        if next.exists() {
            warn!(session = %self.id, "removing stale {}", NEXT_FILE);
            fs::remove_file(&next)?;
        }

        let mut file = OpenOptions::new().write(true).create_new(true).open(&next)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&next, self.checkpoint_path())?;
        File::open(&self.dir)?.sync_all()?;
        debug!(session = %self.id, bytes = data.len(), "checkpoint saved");
        Ok(())
    }

    /// Delete the session directory.
    pub fn remove(self) -> Result<(), StorageError> {
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_storage_tests.rs"]
mod tests;
