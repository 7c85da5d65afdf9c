// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(feature = "test-support", allow(clippy::panic))]

//! ck-core: data model shared by the certification engine, agent and controller

pub mod macros;

pub mod clock;
pub mod id;
pub mod job;
pub mod launcher;
pub mod resource;
pub mod result;
pub mod session;
pub mod unit;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{delay_secs, Clock, FakeClock, SystemClock};
pub use id::short;
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{JobDefinition, JobId, Plugin, ResourceImport, FLAG_CACHABLE, FLAG_NORETURN, FLAG_PRESERVE_CWD};
pub use launcher::{LauncherConfig, LauncherError, UiType};
pub use resource::{parse_records, Resource};
pub use result::{IoLogRecord, IoStream, JobState, Outcome};
pub use session::{
    ResumeCandidate, SessionId, SessionMetadata, SessionState, SessionStatus, FLAG_BOOTSTRAPPING,
    FLAG_INCOMPLETE, FLAG_SUBMITTED,
};
pub use unit::{TemplateUnit, TestPlan, UnitError, UnitFile, UnitStore};
