// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git command line adapter

use super::{GitAdapter, GitError};
use crate::env;
use crate::subprocess::{run_with_timeout, GIT_TIMEOUT};
use async_trait::async_trait;
use lci_core::RepositoryUri;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// How the agent authenticates against the version control server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GitAuth {
    /// Anonymous access (local or public repositories)
    #[default]
    None,
    /// SSH with the agent's key. `clone_base` replaces scheme and host of
    /// HTTP clone URIs, e.g. `ssh://git@vcs.example:7921`.
    Ssh {
        private_key: PathBuf,
        clone_base: Option<String>,
    },
    /// HTTPS with username and access token
    Token { username: String, token: String },
}

/// Git adapter shelling out to the `git` binary
#[derive(Clone, Debug)]
pub struct GitCliAdapter {
    auth: GitAuth,
    binary: String,
}

impl GitCliAdapter {
    pub fn new(auth: GitAuth) -> Self {
        Self {
            auth,
            binary: "git".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let GitAuth::Ssh { private_key, .. } = &self.auth {
            cmd.env("GIT_SSH_COMMAND", ssh_command(private_key));
        }
        cmd
    }

    async fn run(
        &self,
        args: &[&str],
        timeout: Duration,
        description: &str,
    ) -> Result<Output, GitError> {
        let mut cmd = self.command();
        cmd.args(args);
        let output = run_with_timeout(cmd, timeout, description)
            .await
            .map_err(|message| {
                if message.contains(" timed out after ") {
                    GitError::Timeout(message)
                } else {
                    GitError::CommandFailed(message)
                }
            })?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = self.redact(String::from_utf8_lossy(&output.stderr).trim());
        Err(classify_failure(stderr))
    }

    /// Remove credentials from messages that may end up in logs
    fn redact(&self, message: &str) -> String {
        match &self.auth {
            GitAuth::Token { token, .. } if !token.is_empty() => message.replace(token, "***"),
            _ => message.to_string(),
        }
    }
}

fn classify_failure(stderr: String) -> GitError {
    let lower = stderr.to_lowercase();
    let missing = [
        "not found",
        "does not exist",
        "did not match any",
        "could not find remote branch",
        "reference is not a tree",
    ];
    if missing.iter().any(|m| lower.contains(m)) {
        GitError::NotFound(stderr)
    } else {
        GitError::CommandFailed(stderr)
    }
}

pub(crate) fn ssh_command(private_key: &Path) -> String {
    format!(
        "ssh -i '{}' -o IdentitiesOnly=yes -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null",
        private_key.display()
    )
}

/// URL handed to git for `uri` under `auth`
pub(crate) fn remote_url(auth: &GitAuth, uri: &RepositoryUri) -> String {
    let raw = uri.as_str();
    match auth {
        GitAuth::None => raw.to_string(),
        GitAuth::Ssh { clone_base, .. } => match clone_base {
            Some(base) => rebase_url(raw, base),
            None => raw.to_string(),
        },
        GitAuth::Token { username, token } => with_credentials(raw, username, token),
    }
}

fn split_url(raw: &str) -> Option<(&str, &str, &str)> {
    let scheme_end = raw.find("://")?;
    let rest = &raw[scheme_end + 3..];
    let path_start = rest.find('/').unwrap_or(rest.len());
    Some((&raw[..scheme_end], &rest[..path_start], &rest[path_start..]))
}

fn rebase_url(raw: &str, base: &str) -> String {
    match split_url(raw) {
        Some((_, _, path)) => format!("{}{}", base.trim_end_matches('/'), path),
        None => raw.to_string(),
    }
}

fn with_credentials(raw: &str, username: &str, token: &str) -> String {
    match split_url(raw) {
        Some((scheme, authority, path)) if scheme.starts_with("http") => {
            let host = authority.rsplit('@').next().unwrap_or(authority);
            format!("{}://{}:{}@{}{}", scheme, username, token, host, path)
        }
        _ => raw.to_string(),
    }
}

/// Commit hash from the first line of `git ls-remote` output
pub(crate) fn parse_ls_remote(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .filter(|hash| !hash.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl GitAdapter for GitCliAdapter {
    async fn clone_repository(
        &self,
        uri: &RepositoryUri,
        target: &Path,
        branch: &str,
    ) -> Result<(), GitError> {
        let url = remote_url(&self.auth, uri);
        let target = target.to_string_lossy();
        let mut args = vec!["clone", "--quiet"];
        if !branch.is_empty() {
            args.extend(["--branch", branch]);
        }
        args.extend(["--", url.as_str(), target.as_ref()]);
        self.run(&args, env::git_clone_timeout(), "git clone")
            .await
            .map(|_| ())
    }

    async fn checkout(&self, repo: &Path, commit: &str) -> Result<(), GitError> {
        let repo = repo.to_string_lossy();
        let args = ["-C", repo.as_ref(), "checkout", "--quiet", "--force", commit];
        self.run(&args, GIT_TIMEOUT, "git checkout").await.map(|_| ())
    }

    async fn last_commit_hash(
        &self,
        uri: &RepositoryUri,
        branch: &str,
    ) -> Result<Option<String>, GitError> {
        let url = remote_url(&self.auth, uri);
        let head = format!("refs/heads/{}", branch);
        let output = self
            .run(&["ls-remote", url.as_str(), head.as_str()], GIT_TIMEOUT, "git ls-remote")
            .await?;
        Ok(parse_ls_remote(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
