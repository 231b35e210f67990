// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue store backed by a JSON document on disk.
//!
//! Every transaction takes an exclusive lock on a sibling `.lock` file, loads
//! the document, applies the change and rewrites it atomically (write to
//! `.tmp`, then rename). Agent processes sharing the file therefore see a
//! single queue.

use crate::state::QueueState;
use crate::store::QueueStore;
use crate::StoreError;
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use lci_core::{Clock, SystemClock};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Clone)]
pub struct FileQueueStore<C: Clock = SystemClock> {
    path: PathBuf,
    clock: C,
    agent_ttl: Duration,
}

impl FileQueueStore<SystemClock> {
    pub fn open(path: impl Into<PathBuf>, agent_ttl: Duration) -> Result<Self, StoreError> {
        Self::with_clock(path, SystemClock, agent_ttl)
    }
}

impl<C: Clock> FileQueueStore<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C, agent_ttl: Duration) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path, clock, agent_ttl })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }
}

impl<C: Clock> QueueStore for FileQueueStore<C> {
    fn transact<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> Result<R, StoreError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let mut state = load(&self.path)?;
        state.evict_stale_agents(self.clock.now(), self.agent_ttl);
        let result = f(&mut state);
        save(&self.path, &state)?;

        // Lock is released when `lock` drops
        Ok(result)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Load the document; a missing file is an empty queue. A corrupt file is
/// moved aside to `.bak` and replaced by an empty queue.
fn load(path: &Path) -> Result<QueueState, StoreError> {
    if !path.exists() {
        return Ok(QueueState::default());
    }

    let file = File::open(path)?;
    match serde_json::from_reader(BufReader::new(file)) {
        Ok(state) => Ok(state),
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "Corrupt queue file, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(QueueState::default())
        }
    }
}

fn save(path: &Path, state: &QueueState) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, state)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
