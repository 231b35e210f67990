// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable duration formatting for build logs and the CLI.

use std::time::Duration;

/// Format a measured duration with two decimals in the largest fitting unit:
/// `"850ms"`, `"1.25sec"`, `"2.50min"`, `"1.10hours"`.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}sec", secs)
    } else if secs < 3600.0 {
        format!("{:.2}min", secs / 60.0)
    } else {
        format!("{:.2}hours", secs / 3600.0)
    }
}

/// Format seconds as a short age: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
