// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the container engine and git

pub mod container;
mod env;
pub mod git;
pub mod subprocess;
pub mod traced;

pub use container::{
    ContainerAdapter, ContainerError, ContainerInfo, ContainerSpec, DockerCliAdapter, ExecOutput,
    ExecRequest, ResourceLimits,
};
pub use git::{GitAdapter, GitAuth, GitCliAdapter, GitError};
pub use traced::{TracedContainer, TracedGit};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use container::{ContainerCall, FakeContainer, FakeContainerAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use git::{FakeGitAdapter, GitCall};
