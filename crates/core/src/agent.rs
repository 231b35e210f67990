// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build agent identity and the registry entry it publishes.

use crate::job::BuildJobQueueItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Number of finished jobs an agent remembers in its registry entry.
pub const RECENT_BUILD_JOBS_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentNameError {
    #[error("build agent short name must not be empty")]
    Empty,
    #[error("build agent short name {0:?} may only contain lowercase letters, digits and hyphens")]
    InvalidCharacters(String),
}

/// Short names are used in container names and registry keys.
pub fn validate_short_name(name: &str) -> Result<(), AgentNameError> {
    if name.is_empty() {
        return Err(AgentNameError::Empty);
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AgentNameError::InvalidCharacters(name.to_string()))
    }
}

/// Who a build agent is
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Short name, `^[a-z0-9-]+$`
    pub name: String,
    /// Unique per process; the registry key.
    pub member_address: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildAgentStatus {
    /// Building at least one job
    Active,
    Idle,
    /// Not taking new jobs
    Paused,
}

impl BuildAgentStatus {
    pub fn derive(paused: bool, running_jobs: usize) -> Self {
        if paused {
            BuildAgentStatus::Paused
        } else if running_jobs > 0 {
            BuildAgentStatus::Active
        } else {
            BuildAgentStatus::Idle
        }
    }
}

impl fmt::Display for BuildAgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildAgentStatus::Active => "active",
            BuildAgentStatus::Idle => "idle",
            BuildAgentStatus::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Registry entry an agent refreshes on every heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAgentInformation {
    pub build_agent: AgentIdentity,
    pub max_concurrent_builds: usize,
    pub running_build_jobs: Vec<BuildJobQueueItem>,
    pub status: BuildAgentStatus,
    /// Newest last, at most [`RECENT_BUILD_JOBS_LIMIT`] entries.
    pub recent_build_jobs: VecDeque<BuildJobQueueItem>,
    #[serde(default)]
    pub public_ssh_key: Option<String>,
    pub last_heartbeat: DateTime<Utc>,
}

impl BuildAgentInformation {
    pub fn push_recent(&mut self, job: BuildJobQueueItem) {
        self.recent_build_jobs.push_back(job);
        while self.recent_build_jobs.len() > RECENT_BUILD_JOBS_LIMIT {
            self.recent_build_jobs.pop_front();
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
