// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration, read from `agent.toml`.

use lci_adapters::{GitAuth, ResourceLimits};
use lci_core::{validate_short_name, AgentIdentity, AgentNameError};
use lci_engine::{ContainerSettings, ExecutorConfig, ProcessorConfig, ProxySettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::env;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("could not read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("invalid config file {0}: {1}")]
    Parse(PathBuf, #[source] Box<toml::de::Error>),

    #[error(transparent)]
    ShortName(#[from] AgentNameError),

    #[error("max_concurrent_builds must be at least 1")]
    NoBuildSlots,
}

/// How git authenticates against the version control server
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "auth", rename_all = "lowercase", deny_unknown_fields)]
pub enum GitConfig {
    #[default]
    None,
    /// A key pair is generated at startup; `key_path` defaults to
    /// `<state_dir>/id_rsa`.
    Ssh {
        #[serde(default)]
        key_path: Option<PathBuf>,
        #[serde(default)]
        clone_base: Option<String>,
    },
    Token { username: String, token: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConfig {
    /// Caps on what a job may request; 0 means unbounded
    pub max_cpus: u32,
    pub max_memory_mb: u64,
    pub max_memory_swap_mb: u64,
    /// Used when a job requests nothing
    pub default_cpus: Option<u32>,
    pub default_memory_mb: Option<u64>,
    pub default_memory_swap_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// `^[a-z0-9-]+$`; names containers and the registry entry
    pub short_name: String,
    pub display_name: Option<String>,
    pub max_concurrent_builds: usize,
    pub checked_out_repos_path: Option<PathBuf>,
    /// Shared queue document; agents on one host point at the same file
    pub queue_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    /// Registry entries without a heartbeat for this long are evicted
    pub agent_ttl_secs: u64,
    pub pause_grace_period_secs: u64,
    pub job_timeout_secs: u64,
    pub max_clone_attempts: u32,
    pub container_prefix: Option<String>,
    pub docker_binary: String,
    pub resources: ResourceConfig,
    pub proxy: Option<ProxyConfig>,
    pub git: GitConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            short_name: "local".to_string(),
            display_name: None,
            max_concurrent_builds: 1,
            checked_out_repos_path: None,
            queue_path: None,
            poll_interval_ms: lci_engine::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            agent_ttl_secs: 60,
            pause_grace_period_secs: lci_engine::DEFAULT_PAUSE_GRACE_PERIOD.as_secs(),
            job_timeout_secs: lci_engine::DEFAULT_JOB_TIMEOUT.as_secs(),
            max_clone_attempts: lci_engine::DEFAULT_MAX_CLONE_ATTEMPTS,
            container_prefix: None,
            docker_binary: "docker".to_string(),
            resources: ResourceConfig::default(),
            proxy: None,
            git: GitConfig::None,
        }
    }
}

/// Files and folders the agent works in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPaths {
    pub state_dir: PathBuf,
    pub log_path: PathBuf,
    pub checked_out_repos: PathBuf,
    pub queue: PathBuf,
    pub ssh_key: PathBuf,
}

impl AgentConfig {
    /// Read the config from `path`, or from `<state_dir>/agent.toml` when it
    /// exists. Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>, state_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = state_dir.join("agent.toml");
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), Box::new(e)))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(interval) = env::poll_interval_ms() {
            self.poll_interval_ms = interval.as_millis() as u64;
        }
        if let Some(binary) = env::docker_binary() {
            self.docker_binary = binary;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_short_name(&self.short_name)?;
        if self.max_concurrent_builds == 0 {
            return Err(ConfigError::NoBuildSlots);
        }
        Ok(())
    }

    pub fn paths(&self, state_dir: &Path) -> AgentPaths {
        let ssh_key = match &self.git {
            GitConfig::Ssh {
                key_path: Some(path),
                ..
            } => path.clone(),
            _ => state_dir.join("id_rsa"),
        };
        AgentPaths {
            state_dir: state_dir.to_path_buf(),
            log_path: state_dir.join("agent.log"),
            checked_out_repos: self
                .checked_out_repos_path
                .clone()
                .unwrap_or_else(|| state_dir.join("checked-out-repos")),
            queue: self
                .queue_path
                .clone()
                .unwrap_or_else(|| state_dir.join("queue.json")),
            ssh_key,
        }
    }

    /// Identity for this process; the member address is unique per process.
    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity {
            name: self.short_name.clone(),
            member_address: format!("{}/{}", self.short_name, std::process::id()),
            display_name: self
                .display_name
                .clone()
                .unwrap_or_else(|| self.short_name.clone()),
        }
    }

    pub fn agent_ttl(&self) -> Duration {
        Duration::from_secs(self.agent_ttl_secs)
    }

    pub fn container_prefix(&self) -> String {
        self.container_prefix
            .clone()
            .unwrap_or_else(|| format!("lci-{}-", self.short_name))
    }

    pub fn container_settings(&self) -> ContainerSettings {
        let r = &self.resources;
        ContainerSettings {
            max_cpus: r.max_cpus,
            max_memory_mb: r.max_memory_mb,
            max_memory_swap_mb: r.max_memory_swap_mb,
            default_limits: ResourceLimits {
                cpus: r.default_cpus,
                memory_mb: r.default_memory_mb,
                memory_swap_mb: r.default_memory_swap_mb,
            },
            proxy: self.proxy.as_ref().map(|p| ProxySettings {
                http_proxy: p.http_proxy.clone(),
                https_proxy: p.https_proxy.clone(),
                no_proxy: p.no_proxy.clone(),
            }),
        }
    }

    pub fn executor_config(&self, paths: &AgentPaths) -> ExecutorConfig {
        let mut config = ExecutorConfig::new(&paths.checked_out_repos);
        config.stager.max_clone_attempts = self.max_clone_attempts;
        config.container = self.container_settings();
        config.default_timeout = Duration::from_secs(self.job_timeout_secs);
        config
    }

    pub fn processor_config(&self, public_ssh_key: Option<String>) -> ProcessorConfig {
        let mut config = ProcessorConfig::new(self.identity());
        config.max_concurrent_builds = self.max_concurrent_builds;
        config.poll_interval = Duration::from_millis(self.poll_interval_ms.max(1));
        config.pause_grace_period = Duration::from_secs(self.pause_grace_period_secs);
        config.container_prefix = self.container_prefix();
        config.public_ssh_key = public_ssh_key;
        config
    }

    /// Git credentials; SSH uses the key at `paths.ssh_key`.
    pub fn git_auth(&self, paths: &AgentPaths) -> GitAuth {
        match &self.git {
            GitConfig::None => GitAuth::None,
            GitConfig::Ssh { clone_base, .. } => GitAuth::Ssh {
                private_key: paths.ssh_key.clone(),
                clone_base: clone_base.clone(),
            },
            GitConfig::Token { username, token } => GitAuth::Token {
                username: username.clone(),
                token: token.clone(),
            },
        }
    }

    pub fn uses_ssh(&self) -> bool {
        matches!(self.git, GitConfig::Ssh { .. })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
