// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake git adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{GitAdapter, GitError};
use async_trait::async_trait;
use lci_core::RepositoryUri;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded git call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Clone {
        uri: String,
        target: PathBuf,
        branch: String,
    },
    Checkout {
        repo: PathBuf,
        commit: String,
    },
    LastCommitHash {
        uri: String,
        branch: String,
    },
}

#[derive(Default)]
struct FakeGitState {
    calls: Vec<GitCall>,
    /// Remaining failing clone attempts per repository slug
    clone_failures: HashMap<String, u32>,
    heads: HashMap<String, String>,
    lookup_failures: HashSet<String>,
    bad_commits: HashSet<String>,
}

/// Fake git adapter for testing.
///
/// Clones create the target directory with a `README.md` naming the slug.
#[derive(Clone, Default)]
pub struct FakeGitAdapter {
    inner: Arc<Mutex<FakeGitState>>,
}

impl FakeGitAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clone_attempts(&self, slug: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, GitCall::Clone { uri, .. } if uri_slug(uri) == slug))
            .count()
    }

    /// Fail the next `attempts` clones of `slug`
    pub fn fail_clones(&self, slug: &str, attempts: u32) {
        self.inner
            .lock()
            .clone_failures
            .insert(slug.to_string(), attempts);
    }

    pub fn set_head(&self, slug: &str, commit: &str) {
        self.inner
            .lock()
            .heads
            .insert(slug.to_string(), commit.to_string());
    }

    pub fn fail_lookup(&self, slug: &str) {
        self.inner.lock().lookup_failures.insert(slug.to_string());
    }

    pub fn fail_checkout(&self, commit: &str) {
        self.inner.lock().bad_commits.insert(commit.to_string());
    }
}

fn uri_slug(uri: &str) -> String {
    RepositoryUri::parse(uri)
        .map(|u| u.slug().to_string())
        .unwrap_or_default()
}

fn io_error(e: std::io::Error) -> GitError {
    GitError::CommandFailed(e.to_string())
}

#[async_trait]
impl GitAdapter for FakeGitAdapter {
    async fn clone_repository(
        &self,
        uri: &RepositoryUri,
        target: &Path,
        branch: &str,
    ) -> Result<(), GitError> {
        let fail = {
            let mut inner = self.inner.lock();
            inner.calls.push(GitCall::Clone {
                uri: uri.to_string(),
                target: target.to_path_buf(),
                branch: branch.to_string(),
            });
            match inner.clone_failures.get_mut(uri.slug()) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        let non_empty = std::fs::read_dir(target)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if non_empty {
            return Err(GitError::CommandFailed(format!(
                "fatal: destination path '{}' already exists and is not an empty directory.",
                target.display()
            )));
        }

        std::fs::create_dir_all(target).map_err(io_error)?;
        if fail {
            // Leave a partial checkout behind, like an interrupted transfer
            std::fs::write(target.join(".partial"), "").map_err(io_error)?;
            return Err(GitError::CommandFailed(format!(
                "fatal: unable to access '{}': Connection reset by peer",
                uri
            )));
        }
        std::fs::write(target.join("README.md"), uri.slug()).map_err(io_error)?;
        Ok(())
    }

    async fn checkout(&self, repo: &Path, commit: &str) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::Checkout {
            repo: repo.to_path_buf(),
            commit: commit.to_string(),
        });
        if !repo.exists() {
            return Err(GitError::NotFound(format!(
                "fatal: cannot change to '{}'",
                repo.display()
            )));
        }
        if inner.bad_commits.contains(commit) {
            return Err(GitError::NotFound(format!(
                "error: pathspec '{}' did not match any file(s) known to git",
                commit
            )));
        }
        Ok(())
    }

    async fn last_commit_hash(
        &self,
        uri: &RepositoryUri,
        branch: &str,
    ) -> Result<Option<String>, GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::LastCommitHash {
            uri: uri.to_string(),
            branch: branch.to_string(),
        });
        if inner.lookup_failures.contains(uri.slug()) {
            return Err(GitError::CommandFailed(format!(
                "fatal: could not read from remote repository {}",
                uri
            )));
        }
        Ok(inner.heads.get(uri.slug()).cloned())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
