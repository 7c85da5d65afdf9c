// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job outcomes and captured output.

use serde::{Deserialize, Serialize};

/// Outcome of one job within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    #[default]
    Undecided,
    Pass,
    Fail,
    Skip,
    NotSupported,
}

impl Outcome {
    /// Whether the job has reached a final outcome.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Undecided)
    }

    /// Parse a user-supplied answer (`pass`, `fail`, `skip`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Outcome::Pass,
            "fail" => Outcome::Fail,
            "skip" => Outcome::Skip,
            "not-supported" | "not_supported" => Outcome::NotSupported,
            "undecided" => Outcome::Undecided,
            _ => return None,
        })
    }
}

crate::simple_display! {
    Outcome {
        Undecided => "undecided",
        Pass => "pass",
        Fail => "fail",
        Skip => "skip",
        NotSupported => "not-supported",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoStream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    IoStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// One captured line; `delay` is seconds since the previous line of either stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoLogRecord {
    pub delay: f64,
    pub stream: IoStream,
    #[serde(with = "line_data")]
    pub data: Vec<u8>,
}

/// Captured bytes as a JSON string when they are UTF-8, else as a byte array.
mod line_data {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Raw(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(data) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.collect_seq(data),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.into_bytes(),
            Repr::Raw(bytes) => bytes,
        })
    }
}

/// State of one job in one session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobState {
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io_log: Vec<IoLogRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_duration: Option<f64>,
}

impl JobState {
    pub fn with_outcome(outcome: Outcome, comments: impl Into<String>) -> Self {
        Self { outcome, comments: Some(comments.into()), ..Self::default() }
    }

    /// Outcome decided by a return code: zero passes, anything else fails.
    pub fn from_return_code(code: i32, io_log: Vec<IoLogRecord>) -> Self {
        let outcome = if code == 0 { Outcome::Pass } else { Outcome::Fail };
        Self { outcome, return_code: Some(code), io_log, ..Self::default() }
    }

    /// Killed by a signal (negative return code).
    pub fn is_crash(&self) -> bool {
        self.return_code.is_some_and(|rc| rc < 0)
    }

    /// All stdout bytes in capture order.
    pub fn stdout(&self) -> Vec<u8> {
        self.stream_bytes(IoStream::Stdout)
    }

    pub fn stderr(&self) -> Vec<u8> {
        self.stream_bytes(IoStream::Stderr)
    }

    fn stream_bytes(&self, stream: IoStream) -> Vec<u8> {
        self.io_log.iter().filter(|r| r.stream == stream).flat_map(|r| r.data.iter().copied()).collect()
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
