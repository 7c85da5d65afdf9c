// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions: the immutable description of one unit of test work.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

crate::define_id! {
    /// Globally unique, namespaced job identifier (`namespace::partial`).
    pub struct JobId;
}

impl JobId {
    /// Namespace part of the id (before `::`), if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once("::").map(|(ns, _)| ns)
    }

    /// Id without its namespace.
    pub fn partial(&self) -> &str {
        self.0.split_once("::").map_or(&self.0, |(_, partial)| partial)
    }
}

/// How a job is executed and how its outcome is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Plugin {
    /// Automated command; outcome from the return code.
    Shell,
    /// Command whose stdout describes the machine as resource records.
    Resource,
    /// Bootstrap command whose stdout defines more jobs.
    Local,
    /// No command; a human supplies the outcome.
    Manual,
    /// Command runs, then a human confirms the outcome.
    UserVerify,
    /// A human interacts with the command; the outcome is confirmed afterwards.
    UserInteract,
    /// Command output is attached to the report; outcome from the return code.
    Attachment,
}

impl Plugin {
    /// Parse the textual form used in unit files and emitted definitions.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim() {
            "shell" => Plugin::Shell,
            "resource" => Plugin::Resource,
            "local" => Plugin::Local,
            "manual" => Plugin::Manual,
            "user-verify" => Plugin::UserVerify,
            "user-interact" => Plugin::UserInteract,
            "attachment" => Plugin::Attachment,
            _ => return None,
        })
    }

    /// Whether the outcome comes from an external verification signal.
    pub fn needs_verification(&self) -> bool {
        matches!(self, Plugin::Manual | Plugin::UserVerify | Plugin::UserInteract)
    }

    /// Whether a command is expected at all.
    pub fn runs_command(&self) -> bool {
        !matches!(self, Plugin::Manual)
    }
}

crate::simple_display! {
    Plugin {
        Shell => "shell",
        Resource => "resource",
        Local => "local",
        Manual => "manual",
        UserVerify => "user-verify",
        UserInteract => "user-interact",
        Attachment => "attachment",
    }
}

/// `imports` entry: makes resource job `id` available to `requires` as `alias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceImport {
    pub id: JobId,
    pub alias: String,
}

/// Flag asking the executor to keep the caller's working directory.
pub const FLAG_PRESERVE_CWD: &str = "preserve-cwd";
/// Flag marking a job that never returns (it reboots the machine).
pub const FLAG_NORETURN: &str = "noreturn";
/// Flag allowing a resource job's result to be served from the cache.
pub const FLAG_CACHABLE: &str = "cachable";

/// Immutable definition of a job, owned by the unit store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: JobId,
    pub plugin: Plugin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Resource expressions, one per entry; all must hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Jobs that must run first and pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<JobId>,
    /// Jobs that must run first, whatever their outcome.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<JobId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<ResourceImport>,
    /// Target user (`root` for privileged jobs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Launcher environment variables this job consumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environ: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

impl JobDefinition {
    pub fn new(id: impl Into<JobId>, plugin: Plugin) -> Self {
        Self {
            id: id.into(),
            plugin,
            command: None,
            requires: Vec::new(),
            depends: Vec::new(),
            after: Vec::new(),
            imports: Vec::new(),
            user: None,
            environ: Vec::new(),
            flags: BTreeSet::new(),
            summary: None,
            purpose: None,
            steps: None,
            verification: None,
            estimated_duration: None,
        }
    }

    /// Command text, if non-blank.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Whether the job has to run with elevated privileges.
    pub fn needs_root(&self) -> bool {
        self.user.as_deref() == Some("root")
    }

    /// Resource expressions, ignoring blank entries.
    pub fn requirement_lines(&self) -> impl Iterator<Item = &str> {
        self.requires.iter().flat_map(|r| r.lines()).map(str::trim).filter(|l| !l.is_empty())
    }

    /// Content hash of the definition.
    ///
    /// Every textual field is whitespace-normalized before hashing, so
    /// re-serializing a unit with different indentation or line wrapping keeps
    /// the checksum stable.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |key: &str, value: &str| {
            hasher.update(key.as_bytes());
            hasher.update([0]);
            hasher.update(normalize_whitespace(value).as_bytes());
            hasher.update([b'\n']);
        };

        field("id", self.id.as_str());
        field("plugin", &self.plugin.to_string());
        if let Some(command) = &self.command {
            field("command", command);
        }
        for line in self.requirement_lines() {
            field("requires", line);
        }
        for dep in &self.depends {
            field("depends", dep.as_str());
        }
        for dep in &self.after {
            field("after", dep.as_str());
        }
        for import in &self.imports {
            field("imports", &format!("{} as {}", import.id, import.alias));
        }
        if let Some(user) = &self.user {
            field("user", user);
        }
        for name in &self.environ {
            field("environ", name);
        }
        for flag in &self.flags {
            field("flags", flag);
        }
        for (key, value) in [
            ("summary", &self.summary),
            ("purpose", &self.purpose),
            ("steps", &self.steps),
            ("verification", &self.verification),
        ] {
            if let Some(value) = value {
                field(key, value);
            }
        }

        format!("{:x}", hasher.finalize())
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

crate::builder! {
    pub struct JobBuilder => JobDefinition {
        into {
            id: JobId = "test::job",
        }
        set {
            plugin: Plugin = Plugin::Shell,
            command: Option<String> = Some("true".to_string()),
            requires: Vec<String> = Vec::new(),
            depends: Vec<JobId> = Vec::new(),
            after: Vec<JobId> = Vec::new(),
            imports: Vec<ResourceImport> = Vec::new(),
            user: Option<String> = None,
            environ: Vec<String> = Vec::new(),
            flags: BTreeSet<String> = BTreeSet::new(),
        }
        computed {
            summary: Option<String> = None,
            purpose: Option<String> = None,
            steps: Option<String> = None,
            verification: Option<String> = None,
            estimated_duration: Option<f64> = None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobDefinition {
    /// Create a builder with test defaults.
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
