// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lci-core: Data model shared by the local CI build agent, queue and CLI

pub mod agent;
pub mod build_config;
pub mod clock;
pub mod id;
pub mod job;
pub mod repository;
pub mod result;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{
    validate_short_name, AgentIdentity, AgentNameError, BuildAgentInformation, BuildAgentStatus,
    RECENT_BUILD_JOBS_LIMIT,
};
pub use build_config::{BuildConfig, CheckoutPaths, DockerRunConfig, ProgrammingLanguage};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use job::{BuildJobId, BuildJobQueueItem, BuildStatus, JobTimingInfo, StatusTransitionError};
pub use repository::{RepositoryInfo, RepositoryType, RepositoryUri, RepositoryUriError};
pub use result::{
    BuildLogEntry, BuildResult, ResultQueueItem, StaticCodeAnalysisIssue,
    StaticCodeAnalysisReport, StaticCodeAnalysisTool, TestCaseResult, TestJobResult,
};
pub use time_fmt::{format_duration, format_elapsed};
