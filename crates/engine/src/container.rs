// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build container lifecycle on top of a [`ContainerAdapter`].
//!
//! A build container idles in a loop until a sentinel file appears, so the
//! script finishing and the container going away are separate events:
//! results are extracted in between.

use crate::build_logs::BuildLogs;
use crate::error::BuildJobError;
use lci_adapters::container::archive::tar_directory;
use lci_adapters::{ContainerAdapter, ContainerError, ContainerSpec, ExecRequest, ResourceLimits};
use lci_core::{BuildConfig, BuildJobId};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc;

pub const WORKING_DIRECTORY: &str = "/var/tmp";
pub const TESTING_DIRECTORY: &str = "/var/tmp/testing-dir";
pub const RESULTS_DIRECTORY: &str = "/var/tmp/results";
pub const SCRIPT_PATH: &str = "/var/tmp/script.sh";
pub const STOP_SENTINEL: &str = "/var/tmp/stop_container.txt";
pub const DEFAULT_NETWORK: &str = "bridge";

const STOP_GRACE: Duration = Duration::from_secs(15);
const STOP_DEADLINE: Duration = Duration::from_secs(20);
const KILL_DEADLINE: Duration = Duration::from_secs(10);
const REMOVE_DEADLINE: Duration = Duration::from_secs(10);

/// Buffered script output lines between the exec reader and the build log
const LOG_CHANNEL_CAPACITY: usize = 256;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static RESULT_PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_*./-]+$").expect("constant regex pattern is valid"));

/// Rejects result paths that could break out of the mv command or the
/// container's working tree.
pub fn check_result_path(path: &str) -> Result<(), BuildJobError> {
    if RESULT_PATH_PATTERN.is_match(path) && !path.contains("..") {
        Ok(())
    } else {
        Err(BuildJobError::InvalidResultPath(path.to_string()))
    }
}

/// Proxy variables passed to build containers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
}

/// Agent-wide container settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSettings {
    /// Upper bounds for per-job requests; 0 means unbounded
    pub max_cpus: u32,
    pub max_memory_mb: u64,
    pub max_memory_swap_mb: u64,
    /// Limits used for anything a job does not request
    pub default_limits: ResourceLimits,
    pub proxy: Option<ProxySettings>,
}

impl ContainerSettings {
    /// Limits for a job: each positive request is capped at the agent's
    /// maximum, unrequested values fall back to the defaults.
    pub fn limits_for(&self, config: &BuildConfig) -> ResourceLimits {
        let Some(run) = config.docker_run_config.as_ref() else {
            return self.default_limits;
        };
        let cpus = run.cpu_count.filter(|c| *c > 0);
        let memory = run.memory_mb.filter(|m| *m > 0);
        let swap = run.memory_swap_mb.filter(|s| *s > 0);
        if cpus.is_none() && memory.is_none() && swap.is_none() {
            return self.default_limits;
        }
        ResourceLimits {
            cpus: clamp(cpus, self.max_cpus).or(self.default_limits.cpus),
            memory_mb: clamp(memory, self.max_memory_mb).or(self.default_limits.memory_mb),
            memory_swap_mb: clamp(swap, self.max_memory_swap_mb)
                .or(self.default_limits.memory_swap_mb),
        }
    }
}

fn clamp<T: Ord + Default + Copy>(requested: Option<T>, max: T) -> Option<T> {
    requested.map(|r| if max > T::default() { r.min(max) } else { r })
}

/// A repository copied into the container before the script runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMount {
    /// Local clone
    pub local_path: PathBuf,
    /// Location relative to the testing directory; empty for the testing
    /// directory itself
    pub checkout_path: String,
}

impl RepositoryMount {
    pub fn new(local_path: impl Into<PathBuf>, checkout_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            checkout_path: checkout_path.into(),
        }
    }

    fn target(&self) -> String {
        let path = self.checkout_path.trim_matches('/');
        if path.is_empty() {
            TESTING_DIRECTORY.to_string()
        } else {
            format!("{}/{}", TESTING_DIRECTORY, path)
        }
    }
}

#[derive(Clone)]
pub struct BuildContainer<A> {
    adapter: A,
    logs: BuildLogs,
    settings: ContainerSettings,
}

impl<A: ContainerAdapter> BuildContainer<A> {
    pub fn new(adapter: A, logs: BuildLogs, settings: ContainerSettings) -> Self {
        Self {
            adapter,
            logs,
            settings,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Pull `image` unless it is already present
    pub async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        if self.adapter.image_exists(image).await? {
            tracing::debug!(image, "image present, skipping pull");
            return Ok(());
        }
        self.adapter.pull_image(image).await
    }

    /// Create the build container for a job; returns its id
    pub async fn configure(
        &self,
        name: &str,
        config: &BuildConfig,
    ) -> Result<String, ContainerError> {
        let mut env = Vec::new();
        if let Some(proxy) = &self.settings.proxy {
            env.push(("HTTP_PROXY".to_string(), proxy.http_proxy.clone()));
            env.push(("HTTPS_PROXY".to_string(), proxy.https_proxy.clone()));
            env.push(("NO_PROXY".to_string(), proxy.no_proxy.clone()));
        }
        env.push(("SCRIPT".to_string(), config.build_script.clone()));
        if let Some(run) = &config.docker_run_config {
            env.extend(run.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let spec = ContainerSpec {
            name: name.to_string(),
            image: config.docker_image.clone(),
            env,
            entrypoint: vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("while [ ! -f {} ]; do sleep 0.5; done", STOP_SENTINEL),
            ],
            working_dir: None,
            limits: self.settings.limits_for(config),
            auto_remove: true,
        };
        self.adapter.create_container(&spec).await
    }

    pub async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.adapter.start_container(id).await
    }

    /// Copy the repositories into the testing directory and write the build
    /// script. Mounts are copied in order, so later ones win on overlap.
    pub async fn populate(&self, id: &str, mounts: &[RepositoryMount]) -> Result<(), ContainerError> {
        self.setup(id, ["mkdir", "-p", TESTING_DIRECTORY]).await?;
        self.setup(id, ["chmod", "-R", "777", TESTING_DIRECTORY]).await?;

        for mount in mounts {
            self.copy_repository(id, mount).await?;
        }

        let write_script = format!("echo \"$SCRIPT\" > {}", SCRIPT_PATH);
        self.setup(id, ["bash", "-c", write_script.as_str()]).await?;
        let make_executable = format!("chmod +x {}", SCRIPT_PATH);
        self.setup(id, ["bash", "-c", make_executable.as_str()]).await
    }

    async fn copy_repository(&self, id: &str, mount: &RepositoryMount) -> Result<(), ContainerError> {
        let folder = folder_name(&mount.local_path)?;
        let archive = {
            let path = mount.local_path.clone();
            let folder = folder.clone();
            tokio::task::spawn_blocking(move || tar_directory(&path, &folder))
                .await
                .map_err(|e| ContainerError::CommandFailed(e.to_string()))?
                .map_err(|e| {
                    ContainerError::CommandFailed(format!(
                        "Could not create tar archive of {}: {}",
                        mount.local_path.display(),
                        e
                    ))
                })?
        };
        self.adapter
            .copy_to_container(id, WORKING_DIRECTORY, archive)
            .await?;

        let target = mount.target();
        self.setup(id, ["mkdir", "-p", target.as_str()]).await?;
        let source = format!("{}/{}/.", WORKING_DIRECTORY, folder);
        self.setup(id, ["cp", "-r", source.as_str(), target.as_str()])
            .await
    }

    /// Run a root command that must succeed
    async fn setup<const N: usize>(&self, id: &str, cmd: [&str; N]) -> Result<(), ContainerError> {
        let request = ExecRequest::new(cmd).as_root();
        let output = self.adapter.exec(id, &request).await?;
        if output.success() {
            Ok(())
        } else {
            Err(ContainerError::CommandFailed(format!(
                "`{}` exited with code {}: {}",
                request.cmd.join(" "),
                output.exit_code,
                output.stderr.trim()
            )))
        }
    }

    /// Run the build script as the image's default user, streaming its
    /// output into the job's build log. Returns the script's exit code once
    /// the output stream ends.
    pub async fn run_script(
        &self,
        id: &str,
        job_id: &BuildJobId,
        network_disabled: bool,
    ) -> Result<i64, BuildJobError> {
        if network_disabled {
            tracing::info!(container_id = id, "disconnecting container from network");
            if let Err(e) = self.adapter.disconnect_network(id, DEFAULT_NETWORK).await {
                let message = format!(
                    "Failed to disconnect container from default network '{}': {}",
                    DEFAULT_NETWORK, e
                );
                return Err(BuildJobError::container(message, e));
            }
        }

        tracing::info!(container_id = id, job_id = %job_id, "running build script");
        let request = ExecRequest::new(["bash", SCRIPT_PATH]);
        let (tx, mut rx) = mpsc::channel::<String>(LOG_CHANNEL_CAPACITY);
        let exec = self.adapter.exec_streaming(id, &request, tx);
        let collect = async {
            while let Some(line) = rx.recv().await {
                if !line.is_empty() {
                    self.logs.append(job_id, line);
                }
            }
        };
        let (result, ()) = tokio::join!(exec, collect);
        let exit_code = result.map_err(|e| {
            BuildJobError::container(format!("Could not run the build script: {}", e), e)
        })?;
        tracing::info!(container_id = id, job_id = %job_id, exit_code, "build script finished");
        Ok(exit_code)
    }

    /// Move every file matching `source_paths` into `destination`.
    ///
    /// All paths are checked before anything moves. Globs that match
    /// nothing are not errors: a build without reports is detected when the
    /// results are extracted.
    pub async fn move_results(
        &self,
        id: &str,
        source_paths: &[String],
        destination: &str,
    ) -> Result<(), BuildJobError> {
        for path in source_paths {
            check_result_path(path)?;
        }
        let mkdir = format!("shopt -s globstar && mkdir -p {}", destination);
        self.setup(id, ["bash", "-c", mkdir.as_str()])
            .await
            .map_err(|e| {
                BuildJobError::container(format!("Could not create {}", destination), e)
            })?;

        for path in source_paths {
            let mv = format!("shopt -s globstar && mv {} {}", path, destination);
            let request = ExecRequest::new(["bash", "-c", mv.as_str()]).as_root();
            let output = self.adapter.exec(id, &request).await.map_err(|e| {
                BuildJobError::container(format!("Could not move results from {}", path), e)
            })?;
            if !output.success() {
                tracing::debug!(container_id = id, path, exit_code = output.exit_code, "result path matched nothing");
            }
        }
        Ok(())
    }

    /// The results directory as a tar archive, or [`ContainerError::NotFound`]
    pub async fn extract_results(&self, id: &str) -> Result<Vec<u8>, ContainerError> {
        self.adapter.extract_archive(id, RESULTS_DIRECTORY).await
    }

    /// Cooperative stop: the sentinel ends the entrypoint loop and the
    /// container removes itself. No-op for absent or stopped containers.
    pub async fn stop(&self, name: &str) {
        let info = match self.adapter.inspect(name).await {
            Ok(Some(info)) if info.running => info,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(container = name, error = %e, "could not inspect container");
                return;
            }
        };
        tracing::info!(container_id = info.id.as_str(), "stopping container");
        let request = ExecRequest::new(["touch", STOP_SENTINEL]);
        if let Err(e) = self.adapter.exec_detached(&info.id, &request).await {
            tracing::warn!(container_id = info.id.as_str(), error = %e, "could not signal container to stop");
        }
    }

    /// Last-resort teardown for containers that do not react to the
    /// sentinel. Never fails; problems are logged.
    pub async fn stop_unresponsive(&self, id: &str) {
        tracing::warn!(container_id = id, "stopping unresponsive container");
        let stopped = tokio::time::timeout(STOP_DEADLINE, self.adapter.stop_container(id, STOP_GRACE)).await;
        match stopped {
            Ok(Ok(())) => {}
            Ok(Err(ContainerError::NotFound(e))) => {
                tracing::warn!(container_id = id, error = %e, "container already stopped, removing");
                match tokio::time::timeout(REMOVE_DEADLINE, self.adapter.remove_container(id)).await {
                    Ok(Ok(())) | Ok(Err(ContainerError::NotFound(_))) => {}
                    Ok(Err(e)) => tracing::error!(container_id = id, error = %e, "failed to remove container"),
                    Err(_) => tracing::error!(container_id = id, "timed out removing container"),
                }
            }
            other => {
                match other {
                    Ok(Err(e)) => tracing::error!(container_id = id, error = %e, "failed to stop container, killing"),
                    _ => tracing::error!(container_id = id, "timed out stopping container, killing"),
                }
                match tokio::time::timeout(KILL_DEADLINE, self.adapter.kill_container(id)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(container_id = id, error = %e, "failed to kill container"),
                    Err(_) => tracing::error!(container_id = id, "timed out killing container"),
                }
            }
        }
    }

    /// Tear down containers named with `prefix` that a previous run of this
    /// agent left behind. Returns how many were found.
    pub async fn cleanup_stale_containers(&self, prefix: &str) -> Result<usize, ContainerError> {
        let stale = self.adapter.list_containers(prefix).await?;
        for container in &stale {
            tracing::info!(container = container.name.as_str(), running = container.running, "removing leftover build container");
            if container.running {
                self.stop_unresponsive(&container.id).await;
            } else if let Err(e) = self.adapter.remove_container(&container.id).await {
                tracing::warn!(container = container.name.as_str(), error = %e, "could not remove leftover container");
            }
        }
        Ok(stale.len())
    }
}

fn folder_name(path: &Path) -> Result<String, ContainerError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ContainerError::CommandFailed(format!("{} has no folder name", path.display()))
        })
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
