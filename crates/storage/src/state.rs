// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared queue state
//!
//! Plain data plus the transitions every store applies under its lock.
//! Stores differ only in how they serialize access to this value.

use chrono::{DateTime, Duration, Utc};
use lci_core::{AgentIdentity, BuildAgentInformation, BuildJobId, BuildJobQueueItem, BuildStatus, ResultQueueItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{info, warn};

use crate::StoreError;

/// Times a job may be handed back to the queue before it is given up.
pub const MAX_RETRIES: u32 = 5;

/// What a cancellation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was still queued; it was removed and recorded as cancelled.
    Dequeued,
    /// The job is running; its agent will stop it on the next poll.
    Requested,
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Waiting jobs in insertion order
    #[serde(default)]
    pub queued: Vec<BuildJobQueueItem>,
    /// Jobs owned by an agent, by job id
    #[serde(default)]
    pub processing: BTreeMap<String, BuildJobQueueItem>,
    /// Agent registry, by agent short name
    #[serde(default)]
    pub agents: BTreeMap<String, BuildAgentInformation>,
    #[serde(default)]
    pub results: VecDeque<ResultQueueItem>,
    #[serde(default)]
    pub cancel_requests: BTreeSet<String>,
    #[serde(default)]
    pub paused_agents: BTreeSet<String>,
}

impl QueueState {
    pub fn enqueue(&mut self, job: BuildJobQueueItem) -> Result<(), StoreError> {
        let id = job.id.as_str();
        if self.processing.contains_key(id) || self.queued.iter().any(|j| j.id == job.id) {
            return Err(StoreError::DuplicateJob(job.id));
        }
        self.queued.push(job);
        Ok(())
    }

    /// Remove and return the next job: lowest priority value, then earliest
    /// submission, then earliest insertion.
    pub fn dequeue(&mut self) -> Option<BuildJobQueueItem> {
        let index = self.next_index()?;
        Some(self.queued.remove(index))
    }

    fn next_index(&self) -> Option<usize> {
        self.queued
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| a.queue_order(b).then_with(|| ia.cmp(ib)))
            .map(|(i, _)| i)
    }

    pub fn start_processing(&mut self, job: BuildJobQueueItem) {
        self.processing.insert(job.id.as_str().to_string(), job);
    }

    /// Move the next job straight into the processing map, assigned to
    /// `agent`. A job that cannot be assigned stays queued where it was.
    pub fn claim_next(
        &mut self,
        agent: AgentIdentity,
        now: DateTime<Utc>,
    ) -> Result<Option<BuildJobQueueItem>, StoreError> {
        let Some(index) = self.next_index() else {
            return Ok(None);
        };
        let job = self.queued[index].assigned_to(agent, now)?;
        self.queued.remove(index);
        self.start_processing(job.clone());
        Ok(Some(job))
    }

    /// Record a terminal result and release the job everywhere it may still
    /// be listed.
    pub fn finish(&mut self, result: ResultQueueItem) {
        let id = result.build_job.id.clone();
        self.processing.remove(id.as_str());
        self.queued.retain(|j| j.id != id);
        self.cancel_requests.remove(id.as_str());
        self.results.push_back(result);
    }

    /// Hand a processing job back to the queue. After [`MAX_RETRIES`]
    /// hand-backs the job is recorded as failed instead.
    ///
    /// Returns false when the job was not processing.
    pub fn requeue(&mut self, id: &BuildJobId, now: DateTime<Utc>) -> bool {
        let Some(job) = self.processing.remove(id.as_str()) else {
            return false;
        };
        self.cancel_requests.remove(id.as_str());

        if job.retry_count >= MAX_RETRIES {
            warn!(job_id = %id, retries = job.retry_count, "build job handed back too often, giving up");
            let mut failed = job;
            failed.status = BuildStatus::Failed;
            failed.timing.build_completion_date = Some(now);
            self.results.push_back(ResultQueueItem {
                build_result: None,
                build_job: failed,
                build_logs: Vec::new(),
                error: Some(format!("Build job was handed back {MAX_RETRIES} times")),
            });
        } else {
            let job = job.requeued();
            info!(job_id = %id, retry_count = job.retry_count, "adding build job back to the queue");
            self.queued.push(job);
        }
        true
    }

    pub fn upsert_agent(&mut self, info: BuildAgentInformation) {
        self.agents.insert(info.build_agent.name.clone(), info);
    }

    pub fn remove_agent(&mut self, name: &str) -> Option<BuildAgentInformation> {
        self.agents.remove(name)
    }

    /// Drop agents whose last heartbeat is older than `ttl` and hand their
    /// processing jobs back to the queue.
    pub fn evict_stale_agents(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .agents
            .iter()
            .filter(|(_, info)| info.last_heartbeat + ttl < now)
            .map(|(name, _)| name.clone())
            .collect();

        for name in &stale {
            self.agents.remove(name);
            info!(agent = %name, "removed offline build agent");

            let orphaned: Vec<BuildJobId> = self
                .processing
                .values()
                .filter(|job| job.build_agent.as_ref().is_some_and(|a| &a.name == name))
                .map(|job| job.id.clone())
                .collect();
            for id in orphaned {
                self.requeue(&id, now);
            }
        }
        stale
    }

    pub fn request_cancel(&mut self, id: &BuildJobId, now: DateTime<Utc>) -> CancelOutcome {
        if let Some(pos) = self.queued.iter().position(|j| &j.id == id) {
            let job = self.queued.remove(pos);
            let mut cancelled = job;
            cancelled.status = BuildStatus::Cancelled;
            cancelled.timing.build_completion_date = Some(now);
            self.results.push_back(ResultQueueItem {
                build_result: None,
                build_job: cancelled,
                build_logs: Vec::new(),
                error: Some(format!("Build job with id {id} was cancelled.")),
            });
            return CancelOutcome::Dequeued;
        }
        if self.processing.contains_key(id.as_str()) {
            self.cancel_requests.insert(id.as_str().to_string());
            return CancelOutcome::Requested;
        }
        CancelOutcome::NotFound
    }

    pub fn take_results(&mut self) -> Vec<ResultQueueItem> {
        self.results.drain(..).collect()
    }

    pub fn set_paused(&mut self, agent: &str, paused: bool) {
        if paused {
            self.paused_agents.insert(agent.to_string());
        } else {
            self.paused_agents.remove(agent);
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
