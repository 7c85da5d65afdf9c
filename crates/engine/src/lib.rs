// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ck-engine: resolution, readiness, execution and the session assistant

pub mod assistant;
pub mod bootstrap;
pub mod controller;
pub mod executor;
pub mod readiness;
pub mod resolver;

pub use assistant::{AbortHandle, AssistantError, RebootResult, ResumeReport, RunStep, SessionAssistant};
pub use bootstrap::{merge_generated, Generated, GeneratedFailure};
pub use controller::{Capability, CommandSpec, ControllerSelector, ExecutionController};
pub use executor::{ExecContext, ExecError, JobExecutor, ResultCache};
pub use readiness::{inhibitors, readiness, Inhibitor, InhibitorCause, Readiness};
pub use resolver::{resolve, CyclePath, DependencyKind, DependencyResolver, ResolveError};
