// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ck-storage: session checkpoints and the session repository

mod checkpoint;
mod repository;
mod session_storage;

pub use checkpoint::{Checkpoint, CURRENT_CHECKPOINT_VERSION};
pub use repository::SessionRepository;
pub use session_storage::SessionStorage;

use ck_core::SessionId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported checkpoint version {0}")]
    UnsupportedVersion(u32),
    #[error("corrupt checkpoint {path} (moved to {bak}): {reason}")]
    Corrupt { path: PathBuf, bak: PathBuf, reason: String },
    #[error("invalid session id: {0:?}")]
    InvalidId(SessionId),
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error("session already exists: {0}")]
    AlreadyExists(SessionId),
}
