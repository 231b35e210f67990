// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared build queue, processing map, result queue and agent registry

mod error;
mod file;
mod memory;
mod state;
mod store;

pub use error::StoreError;
pub use file::FileQueueStore;
pub use memory::MemoryQueueStore;
pub use state::{CancelOutcome, QueueState, MAX_RETRIES};
pub use store::QueueStore;
