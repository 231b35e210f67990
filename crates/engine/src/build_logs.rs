// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job build logs shown to the submitter.
//!
//! Separate from the agent's tracing output: entries here end up in the
//! published result, so they only carry what a student should see.

use chrono::{DateTime, Utc};
use lci_core::{BuildJobId, BuildLogEntry, Clock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Now = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Append-only log lines keyed by job id, shared by every part of a build.
#[derive(Clone)]
pub struct BuildLogs {
    now: Now,
    entries: Arc<Mutex<HashMap<BuildJobId, Vec<BuildLogEntry>>>>,
}

impl BuildLogs {
    pub fn new(clock: impl Clock) -> Self {
        Self {
            now: Arc::new(move || clock.now()),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn append(&self, job_id: &BuildJobId, line: impl Into<String>) {
        let entry = BuildLogEntry::new((self.now)(), line);
        self.entries
            .lock()
            .entry(job_id.clone())
            .or_default()
            .push(entry);
    }

    /// Copy of the job's log so far
    pub fn get(&self, job_id: &BuildJobId) -> Vec<BuildLogEntry> {
        self.entries.lock().get(job_id).cloned().unwrap_or_default()
    }

    /// Remove and return the job's log
    pub fn take(&self, job_id: &BuildJobId) -> Vec<BuildLogEntry> {
        self.entries.lock().remove(job_id).unwrap_or_default()
    }

    /// Job ids that currently hold log lines
    pub fn job_ids(&self) -> Vec<BuildJobId> {
        self.entries.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "build_logs_tests.rs"]
mod tests;
