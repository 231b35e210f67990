// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Local CI build engine: stages repositories, runs build containers and
//! collects their test results

mod build_logs;
pub mod cancel;
pub mod container;
mod error;
mod executor;
mod processor;
mod stager;

#[cfg(test)]
mod test_helpers;

pub use build_logs::BuildLogs;
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use container::{BuildContainer, ContainerSettings, ProxySettings, RepositoryMount};
pub use error::{BuildJobError, ProcessorError};
pub use executor::{BuildJobExecutor, ExecutorConfig, ExecutorDeps, JobPhase, DEFAULT_JOB_TIMEOUT};
pub use processor::{
    ProcessorConfig, QueueProcessor, DEFAULT_PAUSE_GRACE_PERIOD, DEFAULT_POLL_INTERVAL,
};
pub use stager::{
    LookupTarget, RepositoryStager, StagedRepository, StagerConfig, DEFAULT_MAX_CLONE_ATTEMPTS,
    STALE_CHECKOUT_RETENTION,
};
