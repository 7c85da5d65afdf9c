// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint encoding.
//!
//! A checkpoint is a versioned JSON envelope around the complete
//! `SessionState`, compressed with zstd.

use chrono::{DateTime, Utc};
use ck_core::SessionState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::StorageError;

/// Current checkpoint schema version
pub const CURRENT_CHECKPOINT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Schema version
    #[serde(rename = "v")]
    pub version: u32,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(state: SessionState) -> Self {
        Self { version: CURRENT_CHECKPOINT_VERSION, state, created_at: Utc::now() }
    }

    pub fn encode(&self) -> Result<Vec<u8>, StorageError> {
        let json = serde_json::to_vec(self)?;
        Ok(zstd::encode_all(&json[..], ZSTD_LEVEL)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        let json = zstd::decode_all(bytes)?;
        let checkpoint: Self = serde_json::from_slice(&json)?;
        if checkpoint.version > CURRENT_CHECKPOINT_VERSION {
            return Err(StorageError::UnsupportedVersion(checkpoint.version));
        }
        Ok(checkpoint)
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
