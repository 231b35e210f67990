// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job command handlers

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lci_core::{
    BuildConfig, BuildJobId, BuildJobQueueItem, BuildStatus, IdGen, JobTimingInfo,
    RepositoryInfo, ResultQueueItem,
};
use lci_storage::{CancelOutcome, QueueStore};

use crate::output::{format_optional_ago, format_time_ago, print_json, OutputFormat};
use crate::table::{Column, Table};

const DEFAULT_PRIORITY: i32 = 2;

/// A build request as submitted by an operator, in TOML or JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub course_id: u64,
    #[serde(default)]
    pub exercise_id: u64,
    #[serde(default)]
    pub participation_id: u64,
    pub repository_info: RepositoryInfo,
    pub build_config: BuildConfig,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl JobFile {
    /// Read a job file; `.json` files are JSON, everything else TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file {}", path.display()))?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(anyhow::Error::from),
            _ => toml::from_str(&content).map_err(anyhow::Error::from),
        };
        parsed.with_context(|| format!("invalid job file {}", path.display()))
    }

    pub fn into_queue_item(self, ids: &impl IdGen, now: DateTime<Utc>) -> BuildJobQueueItem {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ids.next());
        BuildJobQueueItem {
            id: BuildJobId::new(id),
            name: self.name,
            build_agent: None,
            priority: self.priority,
            course_id: self.course_id,
            exercise_id: self.exercise_id,
            participation_id: self.participation_id,
            retry_count: 0,
            status: BuildStatus::Queued,
            repository_info: self.repository_info,
            timing: JobTimingInfo::submitted_at(now),
            build_config: self.build_config,
        }
    }
}

/// Submit `file` to the queue, overriding its priority when given.
pub fn enqueue(
    store: &impl QueueStore,
    mut file: JobFile,
    priority: Option<i32>,
    ids: &impl IdGen,
) -> Result<BuildJobQueueItem> {
    if let Some(priority) = priority {
        file.priority = priority;
    }
    let job = file.into_queue_item(ids, store.now());
    store.enqueue(job.clone())?;
    Ok(job)
}

pub fn handle_enqueue(
    store: &impl QueueStore,
    path: &Path,
    priority: Option<i32>,
    ids: &impl IdGen,
    format: OutputFormat,
) -> Result<()> {
    let job = enqueue(store, JobFile::load(path)?, priority, ids)?;
    match format {
        OutputFormat::Text => println!("Queued build job {} ({})", job.id, job.name),
        OutputFormat::Json => print_json(&job)?,
    }
    Ok(())
}

/// Waiting jobs in dequeue order, followed by running jobs.
pub fn active_jobs(store: &impl QueueStore) -> Result<Vec<BuildJobQueueItem>> {
    let mut jobs = store.queued_jobs()?;
    let mut running = store.processing_jobs()?;
    running.sort_by_key(|job| job.timing.build_start_date);
    jobs.extend(running);
    Ok(jobs)
}

pub fn handle_queue(store: &impl QueueStore, format: OutputFormat) -> Result<()> {
    let jobs = active_jobs(store)?;
    match format {
        OutputFormat::Json => print_json(&jobs)?,
        OutputFormat::Text if jobs.is_empty() => println!("No build jobs queued or running"),
        OutputFormat::Text => job_table(&jobs, store.now()).print(),
    }
    Ok(())
}

fn job_table(jobs: &[BuildJobQueueItem], now: DateTime<Utc>) -> Table {
    let mut table = Table::new(vec![
        Column::muted("ID").with_max(12),
        Column::left("NAME").with_max(40),
        Column::status("STATUS"),
        Column::right("PRIO"),
        Column::right("RETRIES"),
        Column::left("AGENT"),
        Column::left("SUBMITTED"),
    ]);
    for job in jobs {
        table.row(vec![
            job.id.to_string(),
            job.name.clone(),
            job.status.to_string(),
            job.priority.to_string(),
            job.retry_count.to_string(),
            job.build_agent
                .as_ref()
                .map_or_else(|| "-".to_string(), |agent| agent.name.clone()),
            format_time_ago(job.timing.submission_date, now),
        ]);
    }
    table
}

#[derive(Debug, Serialize)]
struct CancelReport<'a> {
    id: &'a str,
    outcome: &'static str,
}

/// Cancel a job; a queued job is removed at once, a running job is stopped
/// by its agent on the next poll.
pub fn cancel(store: &impl QueueStore, id: &str) -> Result<CancelOutcome> {
    match store.request_cancel(&BuildJobId::new(id))? {
        CancelOutcome::NotFound => anyhow::bail!("build job {id} is not queued or running"),
        outcome => Ok(outcome),
    }
}

pub fn handle_cancel(store: &impl QueueStore, id: &str, format: OutputFormat) -> Result<()> {
    let outcome = cancel(store, id)?;
    let (label, text) = match outcome {
        CancelOutcome::Dequeued => ("dequeued", "Removed queued build job"),
        _ => ("requested", "Requested cancellation of running build job"),
    };
    match format {
        OutputFormat::Text => println!("{text} {id}"),
        OutputFormat::Json => print_json(&CancelReport { id, outcome: label })?,
    }
    Ok(())
}

pub fn handle_results(store: &impl QueueStore, take: bool, format: OutputFormat) -> Result<()> {
    let results = if take {
        store.take_results()?
    } else {
        store.results()?
    };
    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text if results.is_empty() => println!("No build results"),
        OutputFormat::Text => result_table(&results, store.now()).print(),
    }
    Ok(())
}

/// Passed/failed test counts, or "-" when no report was produced.
pub fn test_summary(item: &ResultQueueItem) -> String {
    match &item.build_result {
        Some(result) => format!(
            "{}/{}",
            result.successful_test_count(),
            result.successful_test_count() + result.failed_test_count()
        ),
        None => "-".to_string(),
    }
}

fn result_table(results: &[ResultQueueItem], now: DateTime<Utc>) -> Table {
    let mut table = Table::new(vec![
        Column::muted("ID").with_max(12),
        Column::left("NAME").with_max(40),
        Column::status("STATUS"),
        Column::right("TESTS"),
        Column::left("COMPLETED"),
        Column::muted("ERROR").with_max(60),
    ]);
    for item in results {
        let job = &item.build_job;
        table.row(vec![
            job.id.to_string(),
            job.name.clone(),
            job.status.to_string(),
            test_summary(item),
            format_optional_ago(job.timing.build_completion_date, now),
            item.error.clone().unwrap_or_default(),
        ]);
    }
    table
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
