// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git adapters for staging repositories

mod cli;

pub use cli::{GitAuth, GitCliAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGitAdapter, GitCall};

use async_trait::async_trait;
use lci_core::RepositoryUri;
use std::path::Path;
use thiserror::Error;

/// Errors from git operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    /// Repository, branch or commit does not exist
    #[error("not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

/// Adapter for fetching repositories
#[async_trait]
pub trait GitAdapter: Clone + Send + Sync + 'static {
    /// Clone `uri` at `branch` into `target`, which must not exist or be empty
    async fn clone_repository(
        &self,
        uri: &RepositoryUri,
        target: &Path,
        branch: &str,
    ) -> Result<(), GitError>;

    /// Check the working tree at `repo` out to `commit`
    async fn checkout(&self, repo: &Path, commit: &str) -> Result<(), GitError>;

    /// Head commit of `branch` on the remote, `None` if the branch has no commits
    async fn last_commit_hash(
        &self,
        uri: &RepositoryUri,
        branch: &str,
    ) -> Result<Option<String>, GitError>;
}
