// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ck_core::Outcome;
use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
use std::io::IsTerminal;

use crate::env;

pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Commands and literals: light grey
    pub const LITERAL: u8 = 250;
    /// Descriptions and context: medium grey
    pub const CONTEXT: u8 = 245;
    pub const PASS: u8 = 114;
    pub const FAIL: u8 = 203;
    pub const SKIP: u8 = 179;
}

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if env::no_color() {
        return false;
    }
    if env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

/// Build clap `Styles` using the project palette.
pub fn styles() -> Styles {
    if !should_colorize() {
        return Styles::plain();
    }
    Styles::styled()
        .header(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::HEADER)))))
        .literal(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::LITERAL)))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::CONTEXT)))))
}

fn paint(code: u8, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[38;5;{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

/// Format text with the header color.
pub fn header(text: &str) -> String {
    paint(codes::HEADER, text)
}

/// Format text with the context color.
pub fn context(text: &str) -> String {
    paint(codes::CONTEXT, text)
}

/// Outcome label, colored by verdict.
pub fn outcome(outcome: Outcome) -> String {
    let label = outcome.to_string();
    match outcome {
        Outcome::Pass => paint(codes::PASS, &label),
        Outcome::Fail => paint(codes::FAIL, &label),
        Outcome::Skip | Outcome::NotSupported => paint(codes::SKIP, &label),
        Outcome::Undecided => label,
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
