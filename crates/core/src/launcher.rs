// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launcher configuration: how a session is started and driven.
//!
//! ```toml
//! [launcher]
//! title = "Nightly"
//!
//! [test_plan]
//! unit = "com.example::smoke"
//! forced = true
//!
//! [ui]
//! type = "silent"
//!
//! [manual]
//! "com.example::look-at-screen" = "pass"
//! ```

use crate::job::JobId;
use crate::result::Outcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("invalid launcher config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid launcher blob: {0}")]
    Blob(#[from] serde_json::Error),
    #[error("invalid answer {answer:?} for manual job {job}")]
    BadAnswer { job: String, answer: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    #[serde(default)]
    pub launcher: LauncherSection,
    #[serde(default)]
    pub test_plan: TestPlanSection,
    #[serde(default)]
    pub ui: UiSection,
    /// Values offered to jobs through their `environ` list.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Pre-supplied outcomes for manual jobs in silent sessions.
    #[serde(default)]
    pub manual: BTreeMap<String, String>,
    #[serde(default)]
    pub execution: ExecutionSection,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LauncherSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestPlanSection {
    /// Test plan id to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Skip interactive test plan selection.
    #[serde(default)]
    pub forced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiType {
    #[default]
    Interactive,
    Silent,
}

crate::simple_display! {
    UiType {
        Interactive => "interactive",
        Silent => "silent",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSection {
    #[serde(rename = "type", default)]
    pub kind: UiType,
    /// Re-run failed jobs at the end of the session.
    #[serde(default)]
    pub auto_retry: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for UiSection {
    fn default() -> Self {
        Self { kind: UiType::default(), auto_retry: false, max_attempts: default_max_attempts() }
    }
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionSection {
    /// Only run resource and attachment jobs; everything else is skipped.
    #[serde(default)]
    pub dry_run: bool,
    /// Path to the external privileged launcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_launcher: Option<PathBuf>,
    /// User that non-root jobs run as when the agent runs as root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_user: Option<String>,
}

impl LauncherConfig {
    pub fn parse(text: &str) -> Result<Self, LauncherError> {
        let config: Self = toml::from_str(text)?;
        for (job, answer) in &config.manual {
            if !matches!(Outcome::parse(answer), Some(o) if o.is_terminal()) {
                return Err(LauncherError::BadAnswer { job: job.clone(), answer: answer.clone() });
            }
        }
        Ok(config)
    }

    /// A session that runs without waiting for a controller.
    pub fn is_silent(&self) -> bool {
        self.ui.kind == UiType::Silent
    }

    /// Pre-supplied answer for a manual job, by full id or partial id.
    pub fn manual_answer(&self, job: &JobId) -> Option<Outcome> {
        self.manual
            .get(job.as_str())
            .or_else(|| self.manual.get(job.partial()))
            .and_then(|answer| Outcome::parse(answer))
    }

    pub fn title(&self) -> Option<&str> {
        self.launcher.title.as_deref()
    }

    /// Encode for storage in session metadata.
    pub fn to_app_blob(&self) -> Result<Vec<u8>, LauncherError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_app_blob(blob: &[u8]) -> Result<Self, LauncherError> {
        Ok(serde_json::from_slice(blob)?)
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
