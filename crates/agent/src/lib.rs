// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lci-agent: the build agent process

pub mod config;
pub mod env;
pub mod keys;
pub mod lifecycle;

pub use config::{AgentConfig, AgentPaths, ConfigError, GitConfig};
pub use keys::{AgentKey, KeyError};
pub use lifecycle::{startup, Agent, LifecycleError, Leftovers};
