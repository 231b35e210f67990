// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle management: startup, leftover cleanup, shutdown.

use std::future::Future;
use std::sync::Arc;

use lci_adapters::{
    ContainerAdapter, DockerCliAdapter, GitAdapter, GitCliAdapter, TracedContainer, TracedGit,
};
use lci_core::{Clock, IdGen, SystemClock, UuidIdGen};
use lci_engine::{
    BuildJobExecutor, ExecutorDeps, ProcessorError, QueueProcessor, STALE_CHECKOUT_RETENTION,
};
use lci_storage::{FileQueueStore, QueueStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AgentConfig, AgentPaths, ConfigError};
use crate::keys::{self, AgentKey, KeyError};

pub type AgentContainers = TracedContainer<DockerCliAdapter>;
pub type AgentGit = TracedGit<GitCliAdapter>;

/// Executor with concrete adapter types (wrapped with tracing)
pub type AgentExecutor = BuildJobExecutor<AgentContainers, AgentGit, SystemClock, UuidIdGen>;

pub type AgentProcessor =
    QueueProcessor<FileQueueStore, AgentContainers, AgentGit, SystemClock, UuidIdGen>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("queue store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What startup found left behind by an earlier agent process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Leftovers {
    pub containers: usize,
    pub checkouts: usize,
    pub orphaned_jobs: usize,
}

/// A started agent
pub struct Agent {
    pub processor: AgentProcessor,
    pub key: Option<AgentKey>,
    pub leftovers: Leftovers,
}

impl Agent {
    /// Process the queue until `shutdown` resolves, then hand running jobs
    /// back and leave the registry.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), LifecycleError> {
        self.processor.run_until(shutdown).await;
        self.processor.shutdown().await?;
        info!("agent stopped");
        Ok(())
    }
}

/// Start the agent
pub async fn startup(config: &AgentConfig, paths: &AgentPaths) -> Result<Agent, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;
    std::fs::create_dir_all(&paths.checked_out_repos)?;

    let key = if config.uses_ssh() {
        let comment = format!("lci-{}", config.short_name);
        Some(keys::provision(&paths.ssh_key, &comment)?)
    } else {
        None
    };

    let containers = TracedContainer::new(DockerCliAdapter::new(config.docker_binary.as_str()));
    let git = TracedGit::new(GitCliAdapter::new(config.git_auth(paths)));
    let executor = Arc::new(BuildJobExecutor::new(
        ExecutorDeps {
            containers,
            git,
            clock: SystemClock,
            ids: UuidIdGen,
        },
        config.executor_config(paths),
    ));

    let ttl = chrono::Duration::from_std(config.agent_ttl()).unwrap_or(chrono::Duration::MAX);
    let store = FileQueueStore::open(&paths.queue, ttl)?;

    let mut leftovers = cleanup_leftovers(&executor, &config.container_prefix()).await;
    leftovers.orphaned_jobs = recover_orphaned_jobs(&store, &config.short_name)?;
    info!(
        containers = leftovers.containers,
        checkouts = leftovers.checkouts,
        orphaned_jobs = leftovers.orphaned_jobs,
        "cleaned up after previous run"
    );

    let public_key = key.as_ref().map(|k| k.public_key().to_string());
    let processor = QueueProcessor::new(store, executor, config.processor_config(public_key));
    processor.heartbeat()?;
    info!(
        agent = config.short_name.as_str(),
        queue = %paths.queue.display(),
        "build agent ready"
    );

    Ok(Agent {
        processor,
        key,
        leftovers,
    })
}

/// Remove build containers and checkout folders a crashed run left behind.
pub async fn cleanup_leftovers<A, G, C, I>(
    executor: &BuildJobExecutor<A, G, C, I>,
    container_prefix: &str,
) -> Leftovers
where
    A: ContainerAdapter,
    G: GitAdapter,
    C: Clock,
    I: IdGen,
{
    let containers = match executor
        .container()
        .cleanup_stale_containers(container_prefix)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "could not list leftover build containers");
            0
        }
    };
    let checkouts = executor
        .stager()
        .cleanup_stale_checkouts(executor.clock().now(), STALE_CHECKOUT_RETENTION);
    Leftovers {
        containers,
        checkouts,
        orphaned_jobs: 0,
    }
}

/// Hand jobs an earlier process of this agent was building back to the
/// queue. A restarted agent refreshes its heartbeat before the old entry
/// expires, so eviction would never release them.
pub fn recover_orphaned_jobs(store: &impl QueueStore, agent: &str) -> Result<usize, StoreError> {
    let mut recovered = 0;
    for job in store.processing_jobs()? {
        let owned = job.build_agent.as_ref().is_some_and(|a| a.name == agent);
        if owned && store.requeue(&job.id)? {
            info!(job_id = %job.id, "recovered build job from previous run");
            recovered += 1;
        }
    }
    Ok(recovered)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
