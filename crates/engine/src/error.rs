// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for build job execution

use lci_adapters::{ContainerError, GitError};
use lci_core::{BuildJobId, BuildStatus};
use thiserror::Error;

/// Why a build job ended without a build result.
///
/// The display text of every variant is the line appended to the job's
/// build log, so it is written for the person reading the log.
#[derive(Debug, Error)]
pub enum BuildJobError {
    #[error("{message}")]
    ImagePull {
        message: String,
        #[source]
        source: ContainerError,
    },
    #[error("{message}")]
    CommitLookup {
        message: String,
        #[source]
        source: GitError,
    },
    #[error("{message}")]
    Clone {
        message: String,
        #[source]
        source: GitError,
    },
    #[error("{message}")]
    Checkout {
        message: String,
        #[source]
        source: GitError,
    },
    #[error("{message}")]
    Container {
        message: String,
        #[source]
        source: ContainerError,
    },
    #[error("invalid result path {0:?}: only letters, digits, '_', '*', '.', '/' and '-' are allowed")]
    InvalidResultPath(String),
    #[error("{message}")]
    ResultArchive {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Build job with id {0} was cancelled.")]
    Cancelled(BuildJobId),
    #[error("Build job with id {id} timed out after {secs} seconds.")]
    TimedOut { id: BuildJobId, secs: u64 },
}

impl BuildJobError {
    pub(crate) fn container(message: impl Into<String>, source: ContainerError) -> Self {
        BuildJobError::Container {
            message: message.into(),
            source,
        }
    }

    /// Terminal status recorded for a job that ended with this error.
    pub fn status(&self) -> BuildStatus {
        match self {
            BuildJobError::Cancelled(_) => BuildStatus::Cancelled,
            BuildJobError::TimedOut { .. } => BuildStatus::TimedOut,
            _ => BuildStatus::Failed,
        }
    }
}

/// Failures of the queue processor itself, as opposed to a job's build.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("queue store error: {0}")]
    Store(#[from] lci_storage::StoreError),
    #[error(transparent)]
    Transition(#[from] lci_core::StatusTransitionError),
}
