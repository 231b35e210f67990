// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository staging: clone, checkout and cleanup of job checkouts.
//!
//! Every clone lives in `<checked_out_repos_path>/<token>/<slug>`, where the
//! token is the commit hash the job builds or a fresh unique id when the hash
//! is not known.

use crate::build_logs::BuildLogs;
use crate::error::BuildJobError;
use chrono::{DateTime, Utc};
use lci_adapters::{GitAdapter, GitError};
use lci_core::{BuildJobId, IdGen, RepositoryUri};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Clone attempts before a job fails
pub const DEFAULT_MAX_CLONE_ATTEMPTS: u32 = 3;

/// Scratch folders older than this are left over from a crash
pub const STALE_CHECKOUT_RETENTION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct StagerConfig {
    pub checked_out_repos_path: PathBuf,
    pub max_clone_attempts: u32,
}

impl StagerConfig {
    pub fn new(checked_out_repos_path: impl Into<PathBuf>) -> Self {
        Self {
            checked_out_repos_path: checked_out_repos_path.into(),
            max_clone_attempts: DEFAULT_MAX_CLONE_ATTEMPTS,
        }
    }
}

/// A repository cloned for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRepository {
    pub uri: RepositoryUri,
    pub branch: String,
    /// Working tree of the clone
    pub path: PathBuf,
    /// Parent folder named after the commit hash or token
    pub scratch_dir: PathBuf,
}

/// Which repository a commit lookup is for, as named in the build log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTarget {
    Assignment,
    Test,
}

impl LookupTarget {
    fn label(self) -> &'static str {
        match self {
            LookupTarget::Assignment => "assignment",
            LookupTarget::Test => "test",
        }
    }
}

#[derive(Clone)]
pub struct RepositoryStager<G, I> {
    git: G,
    ids: I,
    logs: BuildLogs,
    config: StagerConfig,
}

impl<G: GitAdapter, I: IdGen> RepositoryStager<G, I> {
    pub fn new(git: G, ids: I, logs: BuildLogs, config: StagerConfig) -> Self {
        Self {
            git,
            ids,
            logs,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.checked_out_repos_path
    }

    /// Folder all repositories of a build share.
    ///
    /// Commit hashes are only used verbatim when they cannot escape the
    /// checkout root; anything else gets a fresh token.
    pub fn scratch_dir(&self, commit_hash: Option<&str>) -> PathBuf {
        let token = match commit_hash {
            Some(hash) if is_plain_token(hash) => hash.to_string(),
            _ => self.ids.next(),
        };
        self.config.checked_out_repos_path.join(token)
    }

    /// Head commit of `branch`, logged to the job on failure.
    pub async fn last_commit_hash(
        &self,
        job_id: &BuildJobId,
        uri: &RepositoryUri,
        branch: &str,
        target: LookupTarget,
    ) -> Result<Option<String>, BuildJobError> {
        self.git
            .last_commit_hash(uri, branch)
            .await
            .map_err(|source| {
                let message = format!(
                    "Could not find last commit hash for {} repository {}",
                    target.label(),
                    uri.slug()
                );
                self.logs.append(job_id, message.as_str());
                BuildJobError::CommitLookup { message, source }
            })
    }

    /// Clone `uri` into the scratch folder for `commit_hash`, retrying
    /// immediately on failure. With `checkout` set and a hash given, the
    /// working tree is moved to that commit afterwards.
    pub async fn clone(
        &self,
        job_id: &BuildJobId,
        uri: &RepositoryUri,
        branch: &str,
        commit_hash: Option<&str>,
        checkout: bool,
    ) -> Result<StagedRepository, BuildJobError> {
        let scratch_dir = self.scratch_dir(commit_hash);
        let Some(path) = checkout_path(&scratch_dir, uri.folder_name()) else {
            let message = format!(
                "Error while cloning repository {} with uri {}: invalid repository folder",
                uri.slug(),
                uri
            );
            self.logs.append(job_id, message.as_str());
            return Err(BuildJobError::Clone {
                message,
                source: GitError::CommandFailed(format!("invalid repository folder {}", uri.folder_name())),
            });
        };
        let attempts = self.config.max_clone_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.clone_once(uri, &path, branch).await {
                Ok(()) => break,
                Err(source) if attempt >= attempts => {
                    let message = format!(
                        "Error while cloning repository {} with uri {} after {} attempts",
                        uri.slug(),
                        uri,
                        attempts
                    );
                    self.logs.append(job_id, message.as_str());
                    return Err(BuildJobError::Clone { message, source });
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, slug = uri.slug(), attempt, error = %e, "clone failed, retrying");
                    self.logs.append(
                        job_id,
                        format!(
                            "Attempt {} to clone repository {} failed due to {}. Retrying...",
                            attempt,
                            uri.slug(),
                            e
                        ),
                    );
                    attempt += 1;
                }
            }
        }

        let repo = StagedRepository {
            uri: uri.clone(),
            branch: branch.to_string(),
            path,
            scratch_dir,
        };

        if let (true, Some(hash)) = (checkout, commit_hash) {
            if let Err(source) = self.git.checkout(&repo.path, hash).await {
                let message = format!(
                    "Error while checking out commit {} in repository {}",
                    hash,
                    uri.slug()
                );
                self.logs.append(job_id, message.as_str());
                // The caller never sees this clone, so it is removed here
                self.delete(job_id, &repo);
                return Err(BuildJobError::Checkout { message, source });
            }
        }
        Ok(repo)
    }

    async fn clone_once(
        &self,
        uri: &RepositoryUri,
        target: &Path,
        branch: &str,
    ) -> Result<(), GitError> {
        wipe(target).map_err(|e| GitError::CommandFailed(e.to_string()))?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitError::CommandFailed(e.to_string()))?;
        }
        self.git.clone_repository(uri, target, branch).await
    }

    /// Remove a clone. Failures are logged, never returned.
    pub fn delete(&self, job_id: &BuildJobId, repo: &StagedRepository) {
        if let Err(e) = wipe(&repo.path) {
            tracing::error!(job_id = %job_id, path = %repo.path.display(), error = %e, "failed to delete repository");
            self.logs.append(job_id, "Error while deleting repository");
        }
    }

    /// Remove scratch folders, each once. Failures are logged, never returned.
    pub fn delete_scratch_dirs<'a>(
        &self,
        job_id: &BuildJobId,
        dirs: impl IntoIterator<Item = &'a Path>,
    ) {
        let mut seen: Vec<&Path> = Vec::new();
        for dir in dirs {
            if seen.contains(&dir) {
                continue;
            }
            seen.push(dir);
            if let Err(e) = wipe(dir) {
                tracing::error!(job_id = %job_id, path = %dir.display(), error = %e, "failed to delete scratch folder");
                self.logs.append(
                    job_id,
                    format!("Could not delete {} directory", dir.display()),
                );
            }
        }
    }

    /// Delete scratch folders last modified more than `retention` before
    /// `now`. Returns how many were removed.
    pub fn cleanup_stale_checkouts(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let root = &self.config.checked_out_repos_path;
        tracing::debug!(path = %root.display(), "cleaning up stale checkouts");
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::error!(path = %root.display(), error = %e, "could not read checkout folder");
                return 0;
            }
        };
        let cutoff = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|r| now.checked_sub_signed(r))
            .unwrap_or(now);

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "could not inspect checkout");
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "could not inspect checkout");
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "could not delete stale checkout")
                }
            }
        }
        tracing::info!(removed, "stale checkout cleanup done");
        removed
    }
}

fn is_plain_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `<scratch_dir>/<folder>`, or `None` when `folder` is not a single plain
/// path component.
fn checkout_path(scratch_dir: &Path, folder: &str) -> Option<PathBuf> {
    let mut components = Path::new(folder).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Some(scratch_dir.join(name)),
        _ => None,
    }
}

fn wipe(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "stager_tests.rs"]
mod tests;
