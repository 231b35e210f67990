// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::container::{
    ContainerAdapter, ContainerError, ContainerInfo, ContainerSpec, ExecOutput, ExecRequest,
};
use crate::git::{GitAdapter, GitError};
use async_trait::async_trait;
use lci_core::RepositoryUri;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::Instrument;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Wrapper that adds tracing to any ContainerAdapter
#[derive(Clone)]
pub struct TracedContainer<C> {
    inner: C,
}

impl<C> TracedContainer<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ContainerAdapter> ContainerAdapter for TracedContainer<C> {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        let result = self.inner.image_exists(image).await;
        tracing::trace!(image, exists = ?result.as_ref().ok(), "checked image");
        result
    }

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        async {
            tracing::info!("pulling");
            let start = Instant::now();
            let result = self.inner.pull_image(image).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "image pulled"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "pull failed"),
            }
            result
        }
        .instrument(tracing::info_span!("container.pull", image))
        .await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        async {
            tracing::info!(env_count = spec.env.len(), "creating");
            let start = Instant::now();
            let result = self.inner.create_container(spec).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(id) => tracing::info!(container_id = id.as_str(), elapsed_ms, "container created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(tracing::info_span!(
            "container.create",
            name = spec.name.as_str(),
            image = spec.image.as_str()
        ))
        .await
    }

    async fn start_container(&self, id: &str) -> Result<(), ContainerError> {
        let result = self.inner.start_container(id).await;
        tracing::info_span!("container.start", id).in_scope(|| match &result {
            Ok(()) => tracing::info!("started"),
            Err(e) => tracing::error!(error = %e, "start failed"),
        });
        result
    }

    async fn disconnect_network(&self, id: &str, network: &str) -> Result<(), ContainerError> {
        let result = self.inner.disconnect_network(id, network).await;
        if let Err(ref e) = result {
            tracing::error!(id, network, error = %e, "disconnect_network failed");
        }
        result
    }

    async fn copy_to_container(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), ContainerError> {
        let span = tracing::info_span!("container.copy", id, dest_dir, bytes = archive.len());
        async {
            let start = Instant::now();
            let result = self.inner.copy_to_container(id, dest_dir, archive).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(()) => tracing::debug!(elapsed_ms, "copied"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "copy failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, ContainerError> {
        let result = self.inner.exec(id, request).await;
        tracing::info_span!("container.exec", id, user = ?request.user).in_scope(|| match &result {
            Ok(output) => tracing::debug!(exit_code = output.exit_code, cmd = ?request.cmd, "executed"),
            Err(e) => tracing::error!(cmd = ?request.cmd, error = %e, "exec failed"),
        });
        result
    }

    async fn exec_streaming(
        &self,
        id: &str,
        request: &ExecRequest,
        lines: mpsc::Sender<String>,
    ) -> Result<i64, ContainerError> {
        async {
            tracing::info!(cmd = ?request.cmd, "running attached");
            let start = Instant::now();
            let result = self.inner.exec_streaming(id, request, lines).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(exit_code) => tracing::info!(exit_code, elapsed_ms, "attached exec finished"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "attached exec failed"),
            }
            result
        }
        .instrument(tracing::info_span!("container.exec_streaming", id))
        .await
    }

    async fn exec_detached(&self, id: &str, request: &ExecRequest) -> Result<(), ContainerError> {
        let result = self.inner.exec_detached(id, request).await;
        tracing::info_span!("container.exec_detached", id).in_scope(|| match &result {
            Ok(()) => tracing::debug!(cmd = ?request.cmd, "started"),
            Err(e) => tracing::warn!(cmd = ?request.cmd, error = %e, "detached exec failed"),
        });
        result
    }

    async fn extract_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, ContainerError> {
        let result = self.inner.extract_archive(id, path).await;
        tracing::info_span!("container.extract", id, path).in_scope(|| match &result {
            Ok(bytes) => tracing::info!(bytes = bytes.len(), "extracted"),
            Err(ContainerError::NotFound(_)) => tracing::warn!("path not found"),
            Err(e) => tracing::error!(error = %e, "extract failed"),
        });
        result
    }

    async fn inspect(&self, name_or_id: &str) -> Result<Option<ContainerInfo>, ContainerError> {
        let result = self.inner.inspect(name_or_id).await;
        tracing::trace!(name_or_id, found = ?result.as_ref().ok().map(Option::is_some), "inspected");
        result
    }

    async fn list_containers(&self, prefix: &str) -> Result<Vec<ContainerInfo>, ContainerError> {
        let result = self.inner.list_containers(prefix).await;
        tracing::debug!(prefix, count = ?result.as_ref().ok().map(Vec::len), "listed containers");
        result
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), ContainerError> {
        async {
            let start = Instant::now();
            let result = self.inner.stop_container(id, grace).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "stopped"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "stop failed"),
            }
            result
        }
        .instrument(tracing::info_span!("container.stop", id, grace_secs = grace.as_secs()))
        .await
    }

    async fn kill_container(&self, id: &str) -> Result<(), ContainerError> {
        let result = self.inner.kill_container(id).await;
        tracing::info_span!("container.kill", id).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }

    async fn remove_container(&self, id: &str) -> Result<(), ContainerError> {
        let result = self.inner.remove_container(id).await;
        tracing::info_span!("container.remove", id).in_scope(|| match &result {
            Ok(()) => tracing::info!("removed"),
            Err(e) => tracing::warn!(error = %e, "remove failed"),
        });
        result
    }
}

/// Wrapper that adds tracing to any GitAdapter
#[derive(Clone)]
pub struct TracedGit<G> {
    inner: G,
}

impl<G> TracedGit<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: GitAdapter> GitAdapter for TracedGit<G> {
    async fn clone_repository(
        &self,
        uri: &RepositoryUri,
        target: &Path,
        branch: &str,
    ) -> Result<(), GitError> {
        async {
            tracing::info!(branch, "cloning");
            let start = Instant::now();
            let result = self.inner.clone_repository(uri, target, branch).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "repository cloned"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "clone failed"),
            }
            result
        }
        .instrument(tracing::info_span!(
            "git.clone",
            repository = uri.slug(),
            target = %target.display()
        ))
        .await
    }

    async fn checkout(&self, repo: &Path, commit: &str) -> Result<(), GitError> {
        let result = self.inner.checkout(repo, commit).await;
        tracing::info_span!("git.checkout", repo = %repo.display(), commit).in_scope(|| {
            match &result {
                Ok(()) => tracing::info!("checked out"),
                Err(e) => tracing::error!(error = %e, "checkout failed"),
            }
        });
        result
    }

    async fn last_commit_hash(
        &self,
        uri: &RepositoryUri,
        branch: &str,
    ) -> Result<Option<String>, GitError> {
        let result = self.inner.last_commit_hash(uri, branch).await;
        tracing::info_span!("git.last_commit", repository = uri.slug(), branch).in_scope(|| {
            match &result {
                Ok(hash) => tracing::debug!(hash = ?hash, "resolved"),
                Err(e) => tracing::error!(error = %e, "lookup failed"),
            }
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
