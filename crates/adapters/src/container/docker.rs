// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI container adapter (also works with podman)

use super::{
    ContainerAdapter, ContainerError, ContainerInfo, ContainerSpec, ExecOutput, ExecRequest,
};
use crate::env;
use crate::subprocess::{run_with_input, run_with_timeout, ARCHIVE_TIMEOUT, DOCKER_TIMEOUT};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Container adapter driving the `docker` command line client
#[derive(Clone, Debug)]
pub struct DockerCliAdapter {
    binary: String,
}

impl Default for DockerCliAdapter {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCliAdapter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }

    async fn run(
        &self,
        args: Vec<String>,
        timeout: Duration,
        description: &str,
    ) -> Result<Output, ContainerError> {
        let output = run_with_timeout(self.command(&args), timeout, description)
            .await
            .map_err(spawn_error)?;
        check_status(output)
    }
}

fn spawn_error(message: String) -> ContainerError {
    if message.contains(" timed out after ") {
        ContainerError::Timeout(message)
    } else {
        ContainerError::CommandFailed(message)
    }
}

fn check_status(output: Output) -> Result<Output, ContainerError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(classify_failure(&String::from_utf8_lossy(&output.stderr)))
    }
}

/// Map docker's stderr to an error kind
pub(crate) fn classify_failure(stderr: &str) -> ContainerError {
    let message = stderr.trim().to_string();
    let lower = message.to_lowercase();
    let missing = [
        "no such container",
        "no such object",
        "no such image",
        "could not find the file",
        "no such file or directory",
    ];
    if missing.iter().any(|m| lower.contains(m)) {
        ContainerError::NotFound(message)
    } else {
        ContainerError::CommandFailed(message)
    }
}

pub(crate) fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), spec.name.clone()];
    if spec.auto_remove {
        args.push("--rm".to_string());
    }
    if let Some(dir) = &spec.working_dir {
        args.extend(["-w".to_string(), dir.clone()]);
    }
    for (key, value) in &spec.env {
        args.extend(["-e".to_string(), format!("{}={}", key, value)]);
    }
    if let Some(cpus) = spec.limits.cpus {
        args.extend(["--cpus".to_string(), cpus.to_string()]);
    }
    if let Some(memory) = spec.limits.memory_mb {
        args.extend(["--memory".to_string(), format!("{}m", memory)]);
    }
    if let Some(swap) = spec.limits.memory_swap_mb {
        args.extend(["--memory-swap".to_string(), format!("{}m", swap)]);
    }
    let mut entrypoint = spec.entrypoint.iter();
    if let Some(program) = entrypoint.next() {
        args.extend(["--entrypoint".to_string(), program.clone()]);
    }
    args.push(spec.image.clone());
    args.extend(entrypoint.cloned());
    args
}

pub(crate) fn exec_args(id: &str, request: &ExecRequest, detached: bool) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if detached {
        args.push("-d".to_string());
    }
    if let Some(user) = &request.user {
        args.extend(["-u".to_string(), user.clone()]);
    }
    if let Some(dir) = &request.working_dir {
        args.extend(["-w".to_string(), dir.clone()]);
    }
    args.push(id.to_string());
    args.extend(request.cmd.iter().cloned());
    args
}

const INFO_FORMAT: &str = "{{.Id}}|{{.Name}}|{{.State.Running}}";
const PS_FORMAT: &str = "{{.ID}}|{{.Names}}|{{.State}}";

/// Parse one `id|name|running` line from `docker inspect`
pub(crate) fn parse_inspect(line: &str) -> Option<ContainerInfo> {
    let mut parts = line.trim().splitn(3, '|');
    let id = parts.next()?.to_string();
    let name = parts.next()?.trim_start_matches('/').to_string();
    let running = parts.next()?.trim() == "true";
    if id.is_empty() {
        return None;
    }
    Some(ContainerInfo { id, name, running })
}

/// Parse `docker ps` lines, keeping names that start with `prefix`
pub(crate) fn parse_ps(stdout: &str, prefix: &str) -> Vec<ContainerInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(3, '|');
            let id = parts.next()?.to_string();
            let name = parts.next()?.to_string();
            let state = parts.next()?.trim();
            Some(ContainerInfo {
                id,
                name,
                running: state == "running",
            })
        })
        .filter(|c| c.name.starts_with(prefix))
        .collect()
}

async fn forward_lines<R>(reader: R, lines: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        if lines.send(line).await.is_err() {
            break;
        }
    }
}

#[async_trait]
impl ContainerAdapter for DockerCliAdapter {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        let args = vec!["image".into(), "inspect".into(), image.to_string()];
        match self.run(args, DOCKER_TIMEOUT, "docker image inspect").await {
            Ok(_) => Ok(true),
            Err(ContainerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        let args = vec!["pull".into(), "--quiet".into(), image.to_string()];
        self.run(args, env::image_pull_timeout(), "docker pull")
            .await
            .map(|_| ())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let output = self
            .run(create_args(spec), DOCKER_TIMEOUT, "docker create")
            .await?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(ContainerError::CommandFailed(format!(
                "docker create returned no id for {}",
                spec.name
            )));
        }
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), ContainerError> {
        let args = vec!["start".into(), id.to_string()];
        self.run(args, DOCKER_TIMEOUT, "docker start").await.map(|_| ())
    }

    async fn disconnect_network(&self, id: &str, network: &str) -> Result<(), ContainerError> {
        let args = vec![
            "network".into(),
            "disconnect".into(),
            network.to_string(),
            id.to_string(),
        ];
        self.run(args, DOCKER_TIMEOUT, "docker network disconnect")
            .await
            .map(|_| ())
    }

    async fn copy_to_container(
        &self,
        id: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), ContainerError> {
        let args = vec!["cp".into(), "-".into(), format!("{}:{}", id, dest_dir)];
        let output = run_with_input(self.command(&args), archive, ARCHIVE_TIMEOUT, "docker cp")
            .await
            .map_err(spawn_error)?;
        check_status(output).map(|_| ())
    }

    async fn exec(&self, id: &str, request: &ExecRequest) -> Result<ExecOutput, ContainerError> {
        let mut cmd = self.command(&exec_args(id, request, false));
        cmd.stdin(Stdio::null());
        let output = run_with_timeout(cmd, DOCKER_TIMEOUT, "docker exec")
            .await
            .map_err(spawn_error)?;
        let exit_code = output.status.code().map(i64::from).unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        // docker itself failed, not the command inside the container
        if exit_code != 0 && stderr.contains("Error response from daemon") {
            return Err(classify_failure(&stderr));
        }
        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    }

    async fn exec_streaming(
        &self,
        id: &str,
        request: &ExecRequest,
        lines: mpsc::Sender<String>,
    ) -> Result<i64, ContainerError> {
        let mut cmd = self.command(&exec_args(id, request, false));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = cmd
            .spawn()
            .map_err(|e| ContainerError::CommandFailed(format!("docker exec failed: {}", e)))?;

        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(tokio::spawn(forward_lines(stdout, lines.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(tokio::spawn(forward_lines(stderr, lines)));
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ContainerError::CommandFailed(format!("docker exec failed: {}", e)))?;
        for forwarder in forwarders {
            let _ = forwarder.await;
        }
        Ok(status.code().map(i64::from).unwrap_or(-1))
    }

    async fn exec_detached(&self, id: &str, request: &ExecRequest) -> Result<(), ContainerError> {
        self.run(exec_args(id, request, true), DOCKER_TIMEOUT, "docker exec -d")
            .await
            .map(|_| ())
    }

    async fn extract_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, ContainerError> {
        let args = vec!["cp".into(), format!("{}:{}", id, path), "-".into()];
        let output = self.run(args, ARCHIVE_TIMEOUT, "docker cp").await?;
        Ok(output.stdout)
    }

    async fn inspect(&self, name_or_id: &str) -> Result<Option<ContainerInfo>, ContainerError> {
        let args = vec![
            "inspect".into(),
            "--type".into(),
            "container".into(),
            "--format".into(),
            INFO_FORMAT.into(),
            name_or_id.to_string(),
        ];
        match self.run(args, DOCKER_TIMEOUT, "docker inspect").await {
            Ok(output) => Ok(parse_inspect(&String::from_utf8_lossy(&output.stdout))),
            Err(ContainerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_containers(&self, prefix: &str) -> Result<Vec<ContainerInfo>, ContainerError> {
        let args = vec![
            "ps".into(),
            "-a".into(),
            "--no-trunc".into(),
            "--filter".into(),
            format!("name={}", prefix),
            "--format".into(),
            PS_FORMAT.into(),
        ];
        let output = self.run(args, DOCKER_TIMEOUT, "docker ps").await?;
        Ok(parse_ps(&String::from_utf8_lossy(&output.stdout), prefix))
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), ContainerError> {
        let args = vec![
            "stop".into(),
            "-t".into(),
            grace.as_secs().to_string(),
            id.to_string(),
        ];
        let deadline = grace + Duration::from_secs(5);
        self.run(args, deadline, "docker stop").await.map(|_| ())
    }

    async fn kill_container(&self, id: &str) -> Result<(), ContainerError> {
        let args = vec!["kill".into(), id.to_string()];
        self.run(args, DOCKER_TIMEOUT, "docker kill").await.map(|_| ())
    }

    async fn remove_container(&self, id: &str) -> Result<(), ContainerError> {
        let args = vec!["rm".into(), "-f".into(), id.to_string()];
        self.run(args, DOCKER_TIMEOUT, "docker rm").await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
