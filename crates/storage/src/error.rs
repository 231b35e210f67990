// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lci_core::{BuildJobId, StatusTransitionError};
use thiserror::Error;

/// Errors that can occur in queue store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("build job {0} is already queued or running")]
    DuplicateJob(BuildJobId),
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),
}
