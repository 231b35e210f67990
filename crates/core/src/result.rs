// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build outcome: test results, static analysis reports and build logs.

use crate::job::BuildJobQueueItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One timestamped line of a job's build log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLogEntry {
    pub time: DateTime<Utc>,
    pub log: String,
}

impl BuildLogEntry {
    pub fn new(time: DateTime<Utc>, log: impl Into<String>) -> Self {
        Self {
            time,
            log: log.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub name: String,
    #[serde(default)]
    pub classname: Option<String>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl TestCaseResult {
    pub fn new(name: impl Into<String>, classname: Option<String>, messages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            classname,
            messages,
        }
    }
}

/// Results of one test report. Test names in the two lists never overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestJobResult {
    pub failed_tests: Vec<TestCaseResult>,
    pub successful_tests: Vec<TestCaseResult>,
}

impl TestJobResult {
    pub fn is_empty(&self) -> bool {
        self.failed_tests.is_empty() && self.successful_tests.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticCodeAnalysisTool {
    Checkstyle,
    Pmd,
    PmdCpd,
    Spotbugs,
    Swiftlint,
}

impl fmt::Display for StaticCodeAnalysisTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StaticCodeAnalysisTool::Checkstyle => "checkstyle",
            StaticCodeAnalysisTool::Pmd => "pmd",
            StaticCodeAnalysisTool::PmdCpd => "pmd_cpd",
            StaticCodeAnalysisTool::Spotbugs => "spotbugs",
            StaticCodeAnalysisTool::Swiftlint => "swiftlint",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCodeAnalysisIssue {
    pub file_path: String,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub start_column: Option<u32>,
    pub end_column: Option<u32>,
    pub rule: String,
    pub category: String,
    pub message: String,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCodeAnalysisReport {
    pub tool: StaticCodeAnalysisTool,
    pub issues: Vec<StaticCodeAnalysisIssue>,
}

/// Outcome of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub branch: String,
    pub assignment_commit_hash: Option<String>,
    pub test_commit_hash: Option<String>,
    /// At least one test ran and none failed.
    pub successful: bool,
    pub completion_date: DateTime<Utc>,
    pub jobs: Vec<TestJobResult>,
    pub static_code_analysis_reports: Vec<StaticCodeAnalysisReport>,
    pub build_logs: Vec<BuildLogEntry>,
}

impl BuildResult {
    pub fn new(
        branch: impl Into<String>,
        assignment_commit_hash: Option<String>,
        test_commit_hash: Option<String>,
        completion_date: DateTime<Utc>,
        jobs: Vec<TestJobResult>,
        static_code_analysis_reports: Vec<StaticCodeAnalysisReport>,
        build_logs: Vec<BuildLogEntry>,
    ) -> Self {
        let any_failed = jobs.iter().any(|j| !j.failed_tests.is_empty());
        let any_passed = jobs.iter().any(|j| !j.successful_tests.is_empty());
        Self {
            branch: branch.into(),
            assignment_commit_hash,
            test_commit_hash,
            successful: any_passed && !any_failed,
            completion_date,
            jobs,
            static_code_analysis_reports,
            build_logs,
        }
    }

    /// Failed result with no tests, used when no reports could be collected.
    pub fn failed(
        branch: impl Into<String>,
        assignment_commit_hash: Option<String>,
        test_commit_hash: Option<String>,
        completion_date: DateTime<Utc>,
        build_logs: Vec<BuildLogEntry>,
    ) -> Self {
        Self::new(
            branch,
            assignment_commit_hash,
            test_commit_hash,
            completion_date,
            Vec::new(),
            Vec::new(),
            build_logs,
        )
    }

    pub fn failed_test_count(&self) -> usize {
        self.jobs.iter().map(|j| j.failed_tests.len()).sum()
    }

    pub fn successful_test_count(&self) -> usize {
        self.jobs.iter().map(|j| j.successful_tests.len()).sum()
    }
}

/// What an agent publishes when a job leaves its hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultQueueItem {
    /// Absent for jobs that were cancelled, timed out or errored.
    pub build_result: Option<BuildResult>,
    /// The job in its terminal status.
    pub build_job: BuildJobQueueItem,
    pub build_logs: Vec<BuildLogEntry>,
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
