// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use crate::subprocess::{GIT_CLONE_TIMEOUT, IMAGE_PULL_TIMEOUT};
use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Image pull deadline (default: 20 minutes).
pub fn image_pull_timeout() -> Duration {
    parse_duration_ms("LCI_IMAGE_PULL_TIMEOUT_MS").unwrap_or(IMAGE_PULL_TIMEOUT)
}

/// Clone deadline per attempt (default: 5 minutes).
pub fn git_clone_timeout() -> Duration {
    parse_duration_ms("LCI_GIT_CLONE_TIMEOUT_MS").unwrap_or(GIT_CLONE_TIMEOUT)
}
