// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job descriptor and status state machine.

use crate::agent::AgentIdentity;
use crate::build_config::BuildConfig;
use crate::repository::RepositoryInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier of a build job.
///
/// Assigned when the job is enqueued; used for the build log, cancellation
/// and the result published back to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildJobId(String);

impl BuildJobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildJobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl PartialEq<&str> for BuildJobId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for BuildJobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a build job.
///
/// `Queued → Running → {Successful | Failed | Cancelled | TimedOut}`, with
/// `Queued → Cancelled` for jobs cancelled before an agent picked them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Queued,
    Running,
    Successful,
    Failed,
    Cancelled,
    TimedOut,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::Successful
                | BuildStatus::Failed
                | BuildStatus::Cancelled
                | BuildStatus::TimedOut
        )
    }

    pub fn can_transition_to(self, next: BuildStatus) -> bool {
        match (self, next) {
            (BuildStatus::Queued, BuildStatus::Running | BuildStatus::Cancelled) => true,
            (BuildStatus::Running, n) => n.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStatus::Queued => "queued",
            BuildStatus::Running => "running",
            BuildStatus::Successful => "successful",
            BuildStatus::Failed => "failed",
            BuildStatus::Cancelled => "cancelled",
            BuildStatus::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("build job {id} cannot move from {from} to {to}")]
pub struct StatusTransitionError {
    pub id: BuildJobId,
    pub from: BuildStatus,
    pub to: BuildStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTimingInfo {
    pub submission_date: DateTime<Utc>,
    #[serde(default)]
    pub build_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub build_completion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_duration_secs: Option<u64>,
}

impl JobTimingInfo {
    pub fn submitted_at(at: DateTime<Utc>) -> Self {
        Self {
            submission_date: at,
            build_start_date: None,
            build_completion_date: None,
            estimated_duration_secs: None,
        }
    }
}

/// Immutable job descriptor as stored in the shared queue.
///
/// Status and agent changes produce a new item through the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJobQueueItem {
    pub id: BuildJobId,
    pub name: String,
    /// Agent that owns the job; unset while queued.
    #[serde(default)]
    pub build_agent: Option<AgentIdentity>,
    /// Lower values are built first.
    pub priority: i32,
    #[serde(default)]
    pub course_id: u64,
    #[serde(default)]
    pub exercise_id: u64,
    #[serde(default)]
    pub participation_id: u64,
    #[serde(default)]
    pub retry_count: u32,
    pub status: BuildStatus,
    pub repository_info: RepositoryInfo,
    pub timing: JobTimingInfo,
    pub build_config: BuildConfig,
}

impl BuildJobQueueItem {
    /// Copy of the item in `next` status.
    pub fn with_status(&self, next: BuildStatus) -> Result<Self, StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        Ok(Self {
            status: next,
            ..self.clone()
        })
    }

    /// Copy assigned to `agent`, running since `started_at`.
    pub fn assigned_to(
        &self,
        agent: AgentIdentity,
        started_at: DateTime<Utc>,
    ) -> Result<Self, StatusTransitionError> {
        let mut item = self.with_status(BuildStatus::Running)?;
        item.build_agent = Some(agent);
        item.timing.build_start_date = Some(started_at);
        Ok(item)
    }

    /// Copy in a terminal status, completed at `completed_at`.
    pub fn completed(
        &self,
        status: BuildStatus,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, StatusTransitionError> {
        let mut item = self.with_status(status)?;
        item.timing.build_completion_date = Some(completed_at);
        Ok(item)
    }

    /// Copy returned to the queue after its agent gave it up, with the
    /// assignment cleared and the retry count bumped.
    pub fn requeued(&self) -> Self {
        let mut item = self.clone();
        item.status = BuildStatus::Queued;
        item.build_agent = None;
        item.timing.build_start_date = None;
        item.timing.build_completion_date = None;
        item.retry_count += 1;
        item
    }

    /// Queue ordering: priority, then submission date.
    pub fn queue_order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.timing.submission_date.cmp(&other.timing.submission_date))
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
