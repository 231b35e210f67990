// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue primitive shared by every build agent

use crate::state::{CancelOutcome, QueueState};
use crate::StoreError;
use chrono::{DateTime, Utc};
use lci_core::{AgentIdentity, BuildAgentInformation, BuildJobId, BuildJobQueueItem, ResultQueueItem};

/// Shared build queue, processing map, result queue and agent registry.
///
/// Implementors provide exclusive access to the [`QueueState`]; every
/// operation is one transaction. Agents whose heartbeat is older than the
/// store's TTL are evicted at the start of each transaction.
pub trait QueueStore: Clone + Send + Sync + 'static {
    /// Run `f` with exclusive access to the state.
    fn transact<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> Result<R, StoreError>;

    fn now(&self) -> DateTime<Utc>;

    fn enqueue(&self, job: BuildJobQueueItem) -> Result<(), StoreError> {
        self.transact(|state| state.enqueue(job))?
    }

    /// Pop the next job. Concurrent callers never receive the same job.
    fn try_dequeue(&self) -> Result<Option<BuildJobQueueItem>, StoreError> {
        self.transact(QueueState::dequeue)
    }

    /// Dequeue the next job and record it as processing by `agent` in one
    /// transaction.
    fn claim_next(&self, agent: AgentIdentity) -> Result<Option<BuildJobQueueItem>, StoreError> {
        let now = self.now();
        self.transact(|state| state.claim_next(agent, now))?
    }

    fn mark_processing(&self, job: BuildJobQueueItem) -> Result<(), StoreError> {
        self.transact(|state| state.start_processing(job))
    }

    /// Release a finished job and append its result to the result queue.
    fn mark_finished(&self, result: ResultQueueItem) -> Result<(), StoreError> {
        self.transact(|state| state.finish(result))
    }

    /// Hand a processing job back to the queue.
    fn requeue(&self, id: &BuildJobId) -> Result<bool, StoreError> {
        let now = self.now();
        self.transact(|state| state.requeue(id, now))
    }

    fn update_agent_info(&self, info: BuildAgentInformation) -> Result<(), StoreError> {
        self.transact(|state| state.upsert_agent(info))
    }

    fn remove_agent(&self, name: &str) -> Result<Option<BuildAgentInformation>, StoreError> {
        self.transact(|state| state.remove_agent(name))
    }

    fn agents(&self) -> Result<Vec<BuildAgentInformation>, StoreError> {
        self.transact(|state| state.agents.values().cloned().collect())
    }

    /// Waiting jobs in dequeue order.
    fn queued_jobs(&self) -> Result<Vec<BuildJobQueueItem>, StoreError> {
        self.transact(|state| {
            let mut jobs = state.queued.clone();
            jobs.sort_by(|a, b| a.queue_order(b));
            jobs
        })
    }

    fn processing_jobs(&self) -> Result<Vec<BuildJobQueueItem>, StoreError> {
        self.transact(|state| state.processing.values().cloned().collect())
    }

    fn results(&self) -> Result<Vec<ResultQueueItem>, StoreError> {
        self.transact(|state| state.results.iter().cloned().collect())
    }

    /// Drain the result queue.
    fn take_results(&self) -> Result<Vec<ResultQueueItem>, StoreError> {
        self.transact(QueueState::take_results)
    }

    fn request_cancel(&self, id: &BuildJobId) -> Result<CancelOutcome, StoreError> {
        let now = self.now();
        self.transact(|state| state.request_cancel(id, now))
    }

    fn cancel_requests(&self) -> Result<Vec<BuildJobId>, StoreError> {
        self.transact(|state| state.cancel_requests.iter().map(BuildJobId::new).collect())
    }

    fn clear_cancel(&self, id: &BuildJobId) -> Result<(), StoreError> {
        self.transact(|state| {
            state.cancel_requests.remove(id.as_str());
        })
    }

    fn set_paused(&self, agent: &str, paused: bool) -> Result<(), StoreError> {
        self.transact(|state| state.set_paused(agent, paused))
    }

    fn is_paused(&self, agent: &str) -> Result<bool, StoreError> {
        self.transact(|state| state.paused_agents.contains(agent))
    }
}
