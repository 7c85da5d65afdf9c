// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent wire protocol.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. A
//! connection carries any number of request/response pairs, in order.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{ResumeSummary, Response};
pub use wire::{decode, encode, read_message, write_message, ProtocolError, MAX_MESSAGE_SIZE};
pub use wire::{read_request, read_response, write_request, write_response};

/// Default TCP port of the agent.
pub const DEFAULT_PORT: u16 = 18871;

/// Protocol version exchanged in the `Hello` handshake.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod property_tests;
