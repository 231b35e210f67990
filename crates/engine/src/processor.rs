// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue processor: pulls jobs from the shared queue and runs them.
//!
//! One processor per agent process. Every tick it checks the agent's pause
//! flag, forwards cancellation requests to its running jobs, fills free
//! build slots from the queue and refreshes the agent's registry entry.
//! Finished jobs publish their result to the store's result queue.

use crate::cancel::{cancel_pair, CancelHandle};
use crate::error::{BuildJobError, ProcessorError};
use crate::executor::BuildJobExecutor;
use lci_adapters::{ContainerAdapter, GitAdapter};
use lci_core::{
    AgentIdentity, BuildAgentInformation, BuildAgentStatus, BuildJobQueueItem, BuildResult,
    BuildStatus, Clock, IdGen, ResultQueueItem, RECENT_BUILD_JOBS_LIMIT,
};
use lci_storage::QueueStore;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_PAUSE_GRACE_PERIOD: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub identity: AgentIdentity,
    pub max_concurrent_builds: usize,
    pub poll_interval: Duration,
    /// How long running jobs may keep building after the agent is paused.
    /// Jobs still running afterwards are stopped and handed back to the queue.
    pub pause_grace_period: Duration,
    /// Prepended to the job id to name its container
    pub container_prefix: String,
    pub public_ssh_key: Option<String>,
}

impl ProcessorConfig {
    pub fn new(identity: AgentIdentity) -> Self {
        let container_prefix = format!("lci-{}-", identity.name);
        Self {
            identity,
            max_concurrent_builds: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            pause_grace_period: DEFAULT_PAUSE_GRACE_PERIOD,
            container_prefix,
            public_ssh_key: None,
        }
    }
}

struct RunningJob {
    job: BuildJobQueueItem,
    cancel: CancelHandle,
    /// Stopped without publishing a result; the job goes back to the queue.
    handed_back: bool,
}

#[derive(Default)]
struct ProcessorState {
    running: HashMap<String, RunningJob>,
    recent: VecDeque<BuildJobQueueItem>,
    paused_since: Option<Instant>,
    stopping: bool,
}

struct Inner<S, A, G, C, I> {
    store: S,
    executor: Arc<BuildJobExecutor<A, G, C, I>>,
    config: ProcessorConfig,
    state: Mutex<ProcessorState>,
    running_count: watch::Sender<usize>,
    wake: Notify,
}

/// Runs build jobs from a [`QueueStore`] on one agent.
pub struct QueueProcessor<S, A, G, C, I> {
    inner: Arc<Inner<S, A, G, C, I>>,
}

impl<S, A, G, C, I> Clone for QueueProcessor<S, A, G, C, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, G, C, I> QueueProcessor<S, A, G, C, I>
where
    S: QueueStore,
    A: ContainerAdapter,
    G: GitAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(
        store: S,
        executor: Arc<BuildJobExecutor<A, G, C, I>>,
        config: ProcessorConfig,
    ) -> Self {
        let (running_count, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                store,
                executor,
                config,
                state: Mutex::new(ProcessorState::default()),
                running_count,
                wake: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    pub fn executor(&self) -> &Arc<BuildJobExecutor<A, G, C, I>> {
        &self.inner.executor
    }

    pub fn running_jobs(&self) -> Vec<BuildJobQueueItem> {
        let state = self.inner.state.lock();
        let mut jobs: Vec<_> = state.running.values().map(|r| r.job.clone()).collect();
        jobs.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        jobs
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused_since.is_some()
    }

    /// Container name for `job` on this agent
    pub fn container_name(&self, job: &BuildJobQueueItem) -> String {
        format!("{}{}", self.inner.config.container_prefix, job.id)
    }

    pub fn pause(&self) -> Result<(), ProcessorError> {
        self.inner
            .store
            .set_paused(&self.inner.config.identity.name, true)?;
        self.wake();
        Ok(())
    }

    pub fn resume(&self) -> Result<(), ProcessorError> {
        self.inner
            .store
            .set_paused(&self.inner.config.identity.name, false)?;
        self.wake();
        Ok(())
    }

    /// Run a tick before the poll interval elapses
    pub fn wake(&self) {
        self.inner.wake.notify_one();
    }

    /// One poll: pause state, cancellations, new jobs, heartbeat.
    pub fn tick(&self) -> Result<(), ProcessorError> {
        let paused = self.sync_pause_state()?;
        self.forward_cancellations()?;
        if !paused {
            self.fill_capacity()?;
        }
        self.heartbeat()
    }

    fn sync_pause_state(&self) -> Result<bool, ProcessorError> {
        let inner = &self.inner;
        let paused = inner.store.is_paused(&inner.config.identity.name)?;
        let mut state = inner.state.lock();
        match (paused, state.paused_since) {
            (true, None) => {
                tracing::info!(
                    running = state.running.len(),
                    grace_secs = inner.config.pause_grace_period.as_secs(),
                    "pausing build agent"
                );
                state.paused_since = Some(Instant::now());
            }
            (false, Some(_)) => {
                tracing::info!("resuming build agent");
                state.paused_since = None;
            }
            _ => {}
        }
        let grace_expired = state
            .paused_since
            .is_some_and(|since| since.elapsed() >= inner.config.pause_grace_period);
        if grace_expired {
            hand_back_all(&mut state);
        }
        Ok(paused || state.stopping)
    }

    fn forward_cancellations(&self) -> Result<(), ProcessorError> {
        let requests = self.inner.store.cancel_requests()?;
        let state = self.inner.state.lock();
        for id in requests {
            if let Some(running) = state.running.get(id.as_str()) {
                tracing::info!(job_id = %id, "cancelling build job");
                running.cancel.cancel();
            }
        }
        Ok(())
    }

    fn fill_capacity(&self) -> Result<(), ProcessorError> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        while state.running.len() < inner.config.max_concurrent_builds {
            let Some(job) = inner.store.claim_next(inner.config.identity.clone())? else {
                break;
            };
            tracing::info!(job_id = %job.id, priority = job.priority, "processing build job");

            let (cancel, token) = cancel_pair();
            let processor = self.clone();
            let task_job = job.clone();
            let name = self.container_name(&job);
            tokio::spawn(async move {
                let outcome = processor
                    .inner
                    .executor
                    .run(&task_job, &name, &token)
                    .await;
                let job_id = task_job.id.clone();
                // Store writes take a file lock and sync to disk
                let done = tokio::task::spawn_blocking(move || processor.finish(task_job, outcome));
                if let Err(e) = done.await {
                    tracing::error!(job_id = %job_id, error = %e, "build job bookkeeping failed");
                }
            });

            state.running.insert(
                job.id.as_str().to_string(),
                RunningJob {
                    job,
                    cancel,
                    handed_back: false,
                },
            );
            inner.running_count.send_replace(state.running.len());
        }
        Ok(())
    }

    fn finish(&self, job: BuildJobQueueItem, outcome: Result<BuildResult, BuildJobError>) {
        let inner = &self.inner;
        let handed_back = inner
            .state
            .lock()
            .running
            .remove(job.id.as_str())
            .is_some_and(|r| r.handed_back);
        let build_logs = inner.executor.logs().take(&job.id);

        if handed_back {
            match inner.store.requeue(&job.id) {
                Ok(_) => tracing::info!(job_id = %job.id, "handed build job back to the queue"),
                Err(e) => tracing::error!(job_id = %job.id, error = %e, "could not requeue build job"),
            }
        } else if let Err(e) = self.publish(&job, outcome, build_logs) {
            tracing::error!(job_id = %job.id, error = %e, "could not publish build result");
        }

        if let Err(e) = self.heartbeat() {
            tracing::warn!(error = %e, "heartbeat failed");
        }
        // Idle waiters see the count only once the store reflects the job
        let running = inner.state.lock().running.len();
        inner.running_count.send_replace(running);
        self.wake();
    }

    fn publish(
        &self,
        job: &BuildJobQueueItem,
        outcome: Result<BuildResult, BuildJobError>,
        build_logs: Vec<lci_core::BuildLogEntry>,
    ) -> Result<(), ProcessorError> {
        let inner = &self.inner;
        let (status, build_result, error) = match outcome {
            Ok(result) if result.successful => (BuildStatus::Successful, Some(result), None),
            Ok(result) => (BuildStatus::Failed, Some(result), None),
            Err(e) => (e.status(), None, Some(e.to_string())),
        };
        let completed = job.completed(status, inner.store.now())?;
        tracing::info!(job_id = %job.id, %status, "build job finished");

        inner.store.mark_finished(ResultQueueItem {
            build_result,
            build_job: completed.clone(),
            build_logs,
            error,
        })?;

        let mut state = inner.state.lock();
        state.recent.push_back(completed);
        while state.recent.len() > RECENT_BUILD_JOBS_LIMIT {
            state.recent.pop_front();
        }
        Ok(())
    }

    /// Publish this agent's registry entry.
    pub fn heartbeat(&self) -> Result<(), ProcessorError> {
        let inner = &self.inner;
        let info = {
            let state = inner.state.lock();
            let mut running: Vec<_> = state.running.values().map(|r| r.job.clone()).collect();
            running.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
            BuildAgentInformation {
                build_agent: inner.config.identity.clone(),
                max_concurrent_builds: inner.config.max_concurrent_builds,
                status: BuildAgentStatus::derive(state.paused_since.is_some(), running.len()),
                running_build_jobs: running,
                recent_build_jobs: state.recent.clone(),
                public_ssh_key: inner.config.public_ssh_key.clone(),
                last_heartbeat: inner.store.now(),
            }
        };
        inner.store.update_agent_info(info)?;
        Ok(())
    }

    /// Resolves once no job is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.running_count.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Tick every poll interval, or when woken, until `shutdown` resolves.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(self.inner.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = interval.tick() => {}
                () = self.inner.wake.notified() => {}
            }
            let processor = self.clone();
            match tokio::task::spawn_blocking(move || processor.tick()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "queue poll failed"),
                Err(e) => tracing::error!(error = %e, "queue poll task failed"),
            }
        }
    }

    /// Stop taking jobs, hand running jobs back to the queue and leave the
    /// agent registry.
    pub async fn shutdown(&self) -> Result<(), ProcessorError> {
        {
            let mut state = self.inner.state.lock();
            state.stopping = true;
            tracing::info!(running = state.running.len(), "shutting down queue processor");
            hand_back_all(&mut state);
        }
        self.wait_idle().await;
        self.inner
            .store
            .remove_agent(&self.inner.config.identity.name)?;
        Ok(())
    }
}

fn hand_back_all(state: &mut ProcessorState) {
    for (id, running) in state.running.iter_mut() {
        if !running.handed_back {
            tracing::info!(job_id = %id, "stopping build job to hand it back");
            running.handed_back = true;
            running.cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
