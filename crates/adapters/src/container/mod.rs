// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container engine adapters

pub mod archive;
mod docker;

pub use docker::DockerCliAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerCall, FakeContainer, FakeContainerAdapter};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from container operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Container, image or path inside the container does not exist
    #[error("not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

/// CPU and memory limits applied at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    pub cpus: Option<u32>,
    pub memory_mb: Option<u64>,
    pub memory_swap_mb: Option<u64>,
}

/// Everything needed to create a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    /// Entrypoint program followed by its arguments
    pub entrypoint: Vec<String>,
    pub working_dir: Option<String>,
    pub limits: ResourceLimits,
    /// Remove the container once its main process exits
    pub auto_remove: bool,
}

/// A command run inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub cmd: Vec<String>,
    /// `None` runs as the image's default user
    pub user: Option<String>,
    pub working_dir: Option<String>,
}

impl ExecRequest {
    pub fn new<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            user: None,
            working_dir: None,
        }
    }

    pub fn as_root(mut self) -> Self {
        self.user = Some("root".to_string());
        self
    }
}

/// Captured result of a non-streaming exec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Container as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub running: bool,
}

/// Adapter for a container engine (docker, podman)
#[async_trait]
pub trait ContainerAdapter: Clone + Send + Sync + 'static {
    /// Check whether the image is available locally
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError>;

    /// Pull an image from its registry
    async fn pull_image(&self, image: &str) -> Result<(), ContainerError>;

    /// Create (but do not start) a container; returns its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, ContainerError>;

    async fn start_container(&self, id: &str) -> Result<(), ContainerError>;

    /// Detach the container from a network
    async fn disconnect_network(&self, id: &str, network: &str) -> Result<(), ContainerError>;

    /// Extract a tar archive into `dest_dir` inside the container
    async fn copy_to_container(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), ContainerError>;

    /// Run a command and capture its output
    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, ContainerError>;

    /// Run a command attached, sending each output line to `lines` as it
    /// arrives; returns the exit code once the output stream ends
    async fn exec_streaming(
        &self,
        id: &str,
        request: &ExecRequest,
        lines: mpsc::Sender<String>,
    ) -> Result<i64, ContainerError>;

    /// Start a command and return without waiting for it
    async fn exec_detached(&self, id: &str, request: &ExecRequest) -> Result<(), ContainerError>;

    /// Read `path` out of the container as a tar archive.
    ///
    /// Returns [`ContainerError::NotFound`] when the path does not exist.
    async fn extract_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, ContainerError>;

    /// Look a container up by name or id
    async fn inspect(&self, name_or_id: &str) -> Result<Option<ContainerInfo>, ContainerError>;

    /// All containers (running or not) whose name starts with `prefix`
    async fn list_containers(&self, prefix: &str) -> Result<Vec<ContainerInfo>, ContainerError>;

    /// Stop with SIGTERM, escalating to SIGKILL after `grace`
    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), ContainerError>;

    async fn kill_container(&self, id: &str) -> Result<(), ContainerError>;

    /// Force-remove a container
    async fn remove_container(&self, id: &str) -> Result<(), ContainerError>;
}
