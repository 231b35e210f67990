// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("cannot locate the queue: set LCI_QUEUE, LCI_STATE_DIR or HOME")]
pub struct NoQueuePath;

// --- Queue location ---

/// Resolve state directory: LCI_STATE_DIR > XDG_STATE_HOME/lci > ~/.local/state/lci
pub fn state_dir() -> Result<PathBuf, NoQueuePath> {
    if let Ok(dir) = std::env::var("LCI_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("lci"));
    }
    let home = std::env::var("HOME").map_err(|_| NoQueuePath)?;
    Ok(PathBuf::from(home).join(".local/state/lci"))
}

/// Queue file shared with the agents: LCI_QUEUE > `<state dir>/queue.json`
pub fn queue_path() -> Result<PathBuf, NoQueuePath> {
    if let Ok(path) = std::env::var("LCI_QUEUE") {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join("queue.json"))
}

pub fn agent_ttl_secs() -> Option<i64> {
    std::env::var("LCI_AGENT_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
