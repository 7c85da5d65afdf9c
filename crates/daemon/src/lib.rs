// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ck agent library
//!
//! The agent owns the session assistant and serves controllers over TCP.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent;
pub mod autopilot;
pub mod env;
pub mod lifecycle;
pub mod listener;

pub use agent::{Agent, Driver};
pub use lifecycle::{startup, Config, LifecycleError, StartupResult};
pub use listener::Listener;
