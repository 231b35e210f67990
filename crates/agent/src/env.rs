// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

/// Resolve state directory: LCI_STATE_DIR > XDG_STATE_HOME/lci > ~/.local/state/lci
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("LCI_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("lci"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/lci"))
}

/// Config file override
pub fn config_path() -> Option<PathBuf> {
    std::env::var("LCI_CONFIG").ok().map(PathBuf::from)
}

/// Queue poll interval override
pub fn poll_interval_ms() -> Option<Duration> {
    std::env::var("LCI_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Container engine binary override, e.g. `podman`
pub fn docker_binary() -> Option<String> {
    std::env::var("LCI_DOCKER_BINARY")
        .ok()
        .filter(|s| !s.trim().is_empty())
}
