// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process queue store

use crate::state::QueueState;
use crate::store::QueueStore;
use crate::StoreError;
use chrono::{DateTime, Duration, Utc};
use lci_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;

/// Queue store shared by clones within one process.
#[derive(Clone)]
pub struct MemoryQueueStore<C: Clock = SystemClock> {
    state: Arc<Mutex<QueueState>>,
    clock: C,
    agent_ttl: Duration,
}

impl MemoryQueueStore<SystemClock> {
    pub fn new(agent_ttl: Duration) -> Self {
        Self::with_clock(SystemClock, agent_ttl)
    }
}

impl<C: Clock> MemoryQueueStore<C> {
    pub fn with_clock(clock: C, agent_ttl: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(QueueState::default())), clock, agent_ttl }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> QueueState {
        self.state.lock().clone()
    }
}

impl<C: Clock> QueueStore for MemoryQueueStore<C> {
    fn transact<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> Result<R, StoreError> {
        let mut state = self.state.lock();
        state.evict_stale_agents(self.clock.now(), self.agent_ttl);
        Ok(f(&mut state))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
