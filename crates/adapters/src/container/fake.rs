// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake container adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    ContainerAdapter, ContainerError, ContainerInfo, ContainerSpec, ExecOutput, ExecRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Recorded container call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerCall {
    ImageExists { image: String },
    PullImage { image: String },
    Create { spec: ContainerSpec },
    Start { id: String },
    DisconnectNetwork { id: String, network: String },
    CopyTo { id: String, dest_dir: String, bytes: usize },
    Exec { id: String, request: ExecRequest },
    ExecStreaming { id: String, request: ExecRequest },
    ExecDetached { id: String, request: ExecRequest },
    ExtractArchive { id: String, path: String },
    Inspect { name_or_id: String },
    ListContainers { prefix: String },
    Stop { id: String, grace: Duration },
    Kill { id: String },
    Remove { id: String },
}

/// Fake container state
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub spec: ContainerSpec,
    pub running: bool,
    pub removed: bool,
    /// `(dest_dir, archive)` for every copy into the container
    pub uploads: Vec<(String, Vec<u8>)>,
}

impl FakeContainer {
    fn info(&self) -> ContainerInfo {
        ContainerInfo {
            id: self.id.clone(),
            name: self.spec.name.clone(),
            running: self.running,
        }
    }

    fn exit(&mut self) {
        self.running = false;
        if self.spec.auto_remove {
            self.removed = true;
        }
    }
}

#[derive(Default)]
struct FakeContainerState {
    images: HashSet<String>,
    pull_error: Option<ContainerError>,
    containers: BTreeMap<String, FakeContainer>,
    archives: HashMap<String, Vec<u8>>,
    script_output: Vec<String>,
    script_exit_code: i64,
    hang_streaming: bool,
    hang_stop: bool,
    stop_error: Option<ContainerError>,
    failing_commands: Vec<String>,
    calls: Vec<ContainerCall>,
    next_id: u64,
}

impl FakeContainerState {
    fn live(&mut self, id: &str) -> Result<&mut FakeContainer, ContainerError> {
        self.containers
            .get_mut(id)
            .filter(|c| !c.removed)
            .ok_or_else(|| ContainerError::NotFound(format!("No such container: {}", id)))
    }

    fn running(&mut self, id: &str) -> Result<&mut FakeContainer, ContainerError> {
        let container = self.live(id)?;
        if !container.running {
            return Err(ContainerError::CommandFailed(format!(
                "container {} is not running",
                id
            )));
        }
        Ok(container)
    }

    fn exit_code_for(&self, request: &ExecRequest) -> i64 {
        let joined = request.cmd.join(" ");
        if self.failing_commands.iter().any(|c| joined.contains(c)) {
            1
        } else {
            0
        }
    }
}

/// Fake container adapter for testing
#[derive(Clone, Default)]
pub struct FakeContainerAdapter {
    inner: Arc<Mutex<FakeContainerState>>,
}

impl FakeContainerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ContainerCall> {
        self.inner.lock().calls.clone()
    }

    /// All containers ever created, including removed ones
    pub fn containers(&self) -> Vec<FakeContainer> {
        self.inner.lock().containers.values().cloned().collect()
    }

    /// Containers that have not been removed
    pub fn live_containers(&self) -> Vec<FakeContainer> {
        self.inner
            .lock()
            .containers
            .values()
            .filter(|c| !c.removed)
            .cloned()
            .collect()
    }

    pub fn container_by_name(&self, name: &str) -> Option<FakeContainer> {
        self.inner
            .lock()
            .containers
            .values()
            .find(|c| c.spec.name == name)
            .cloned()
    }

    /// Commands run through `exec`, `exec_streaming` and `exec_detached`, joined by spaces
    pub fn executed_commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ContainerCall::Exec { request, .. }
                | ContainerCall::ExecStreaming { request, .. }
                | ContainerCall::ExecDetached { request, .. } => Some(request.cmd.join(" ")),
                _ => None,
            })
            .collect()
    }

    pub fn add_image(&self, image: &str) {
        self.inner.lock().images.insert(image.to_string());
    }

    pub fn set_pull_error(&self, error: ContainerError) {
        self.inner.lock().pull_error = Some(error);
    }

    /// Serve `archive` for `extract_archive` of `path`
    pub fn set_archive(&self, path: &str, archive: Vec<u8>) {
        self.inner.lock().archives.insert(path.to_string(), archive);
    }

    /// Lines and exit code produced by streaming execs
    pub fn set_script_output(&self, lines: Vec<String>, exit_code: i64) {
        let mut inner = self.inner.lock();
        inner.script_output = lines;
        inner.script_exit_code = exit_code;
    }

    /// Streaming execs emit their output and then never complete
    pub fn hang_script(&self) {
        self.inner.lock().hang_streaming = true;
    }

    /// `stop_container` never completes
    pub fn hang_stop(&self) {
        self.inner.lock().hang_stop = true;
    }

    pub fn set_stop_error(&self, error: ContainerError) {
        self.inner.lock().stop_error = Some(error);
    }

    /// Execs whose command line contains `pattern` exit with code 1
    pub fn fail_command(&self, pattern: &str) {
        self.inner.lock().failing_commands.push(pattern.to_string());
    }

    /// Register an already running container, e.g. left over from a crash
    pub fn add_running_container(&self, name: &str, image: &str) -> String {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);
        let spec = ContainerSpec {
            name: name.to_string(),
            image: image.to_string(),
            env: Vec::new(),
            entrypoint: Vec::new(),
            working_dir: None,
            limits: Default::default(),
            auto_remove: true,
        };
        inner.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                spec,
                running: true,
                removed: false,
                uploads: Vec::new(),
            },
        );
        id
    }
}

#[async_trait]
impl ContainerAdapter for FakeContainerAdapter {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::ImageExists {
            image: image.to_string(),
        });
        Ok(inner.images.contains(image))
    }

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::PullImage {
            image: image.to_string(),
        });
        if let Some(error) = inner.pull_error.clone() {
            return Err(error);
        }
        inner.images.insert(image.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::Create { spec: spec.clone() });
        let name_taken = inner
            .containers
            .values()
            .any(|c| !c.removed && c.spec.name == spec.name);
        if name_taken {
            return Err(ContainerError::CommandFailed(format!(
                "Conflict. The container name \"/{}\" is already in use",
                spec.name
            )));
        }
        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);
        inner.containers.insert(
            id.clone(),
            FakeContainer {
                id: id.clone(),
                spec: spec.clone(),
                running: false,
                removed: false,
                uploads: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::Start { id: id.to_string() });
        inner.live(id)?.running = true;
        Ok(())
    }

    async fn disconnect_network(&self, id: &str, network: &str) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::DisconnectNetwork {
            id: id.to_string(),
            network: network.to_string(),
        });
        inner.live(id)?;
        Ok(())
    }

    async fn copy_to_container(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::CopyTo {
            id: id.to_string(),
            dest_dir: dest_dir.to_string(),
            bytes: archive.len(),
        });
        inner
            .running(id)?
            .uploads
            .push((dest_dir.to_string(), archive));
        Ok(())
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::Exec {
            id: id.to_string(),
            request: request.clone(),
        });
        inner.running(id)?;
        Ok(ExecOutput {
            exit_code: inner.exit_code_for(request),
            ..ExecOutput::default()
        })
    }

    async fn exec_streaming(
        &self,
        id: &str,
        request: &ExecRequest,
        lines: mpsc::Sender<String>,
    ) -> Result<i64, ContainerError> {
        let (output, exit_code, hang) = {
            let mut inner = self.inner.lock();
            inner.calls.push(ContainerCall::ExecStreaming {
                id: id.to_string(),
                request: request.clone(),
            });
            inner.running(id)?;
            (
                inner.script_output.clone(),
                inner.script_exit_code,
                inner.hang_streaming,
            )
        };
        for line in output {
            if lines.send(line).await.is_err() {
                break;
            }
        }
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(exit_code)
    }

    async fn exec_detached(&self, id: &str, request: &ExecRequest) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::ExecDetached {
            id: id.to_string(),
            request: request.clone(),
        });
        let container = inner.running(id)?;
        // Touching a file the entrypoint waits for ends the container
        if let [program, path] = request.cmd.as_slice() {
            if program == "touch" && container.spec.entrypoint.join(" ").contains(path.as_str()) {
                container.exit();
            }
        }
        Ok(())
    }

    async fn extract_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::ExtractArchive {
            id: id.to_string(),
            path: path.to_string(),
        });
        inner.live(id)?;
        inner.archives.get(path).cloned().ok_or_else(|| {
            ContainerError::NotFound(format!(
                "Could not find the file {} in container {}",
                path, id
            ))
        })
    }

    async fn inspect(&self, name_or_id: &str) -> Result<Option<ContainerInfo>, ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::Inspect {
            name_or_id: name_or_id.to_string(),
        });
        Ok(inner
            .containers
            .values()
            .filter(|c| !c.removed)
            .find(|c| c.id == name_or_id || c.spec.name == name_or_id)
            .map(FakeContainer::info))
    }

    async fn list_containers(&self, prefix: &str) -> Result<Vec<ContainerInfo>, ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::ListContainers {
            prefix: prefix.to_string(),
        });
        Ok(inner
            .containers
            .values()
            .filter(|c| !c.removed && c.spec.name.starts_with(prefix))
            .map(FakeContainer::info)
            .collect())
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), ContainerError> {
        let hang = {
            let mut inner = self.inner.lock();
            inner.calls.push(ContainerCall::Stop {
                id: id.to_string(),
                grace,
            });
            if let Some(error) = inner.stop_error.clone() {
                return Err(error);
            }
            inner.hang_stop
        };
        if hang {
            std::future::pending::<()>().await;
        }
        self.inner.lock().live(id)?.exit();
        Ok(())
    }

    async fn kill_container(&self, id: &str) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::Kill { id: id.to_string() });
        inner.live(id)?.exit();
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ContainerCall::Remove { id: id.to_string() });
        let container = inner.live(id)?;
        container.running = false;
        container.removed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
