// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;

pub mod codes {
    /// Table headers: steel blue
    pub const HEADER: u8 = 74;
    /// Secondary columns: darker grey
    pub const MUTED: u8 = 240;

    #[cfg(test)]
    pub const HEADER_START: &str = "\x1b[38;5;74m";
    #[cfg(test)]
    pub const RESET: &str = "\x1b[0m";
}

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    if crate::env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

const RESET: &str = "\x1b[0m";

pub(crate) fn apply_header(text: &str) -> String {
    format!("{}{}{}", fg256(codes::HEADER), text, RESET)
}

pub(crate) fn apply_muted(text: &str) -> String {
    format!("{}{}{}", fg256(codes::MUTED), text, RESET)
}

/// Colorize a build or agent status.
///
/// - Green: successful, running, active
/// - Yellow: queued, idle, paused
/// - Red: failed, cancelled, timed_out
pub fn status(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    apply_status(text)
}

pub(crate) fn apply_status(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let code = match lower.as_str() {
        "successful" | "running" | "active" => "\x1b[32m",
        "queued" | "idle" | "paused" => "\x1b[33m",
        "failed" | "cancelled" | "timed_out" => "\x1b[31m",
        _ => return text.to_string(),
    };
    format!("{code}{text}{RESET}")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
