// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect backoff for the controller.

use std::time::{Duration, Instant};

pub const INITIAL_DELAY: Duration = Duration::from_millis(250);
pub const MAX_DELAY: Duration = Duration::from_secs(5);

/// Exponential delays: 250 ms doubling up to 5 s, until the deadline passes.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    deadline: Instant,
}

impl Backoff {
    pub fn starting_at(start: Instant, give_up_after: Duration) -> Self {
        Self { next: INITIAL_DELAY, deadline: start + give_up_after }
    }

    /// Delay before the next attempt, or `None` once `now` is past the deadline.
    pub fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        if now >= self.deadline {
            return None;
        }
        let delay = self.next.min(self.deadline - now);
        self.next = (self.next * 2).min(MAX_DELAY);
        Some(delay)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
