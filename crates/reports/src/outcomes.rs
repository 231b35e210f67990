// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accumulates test outcomes across report files

use crate::junit::{ParsedTestCase, TestOutcome};
use lci_core::{TestCaseResult, TestJobResult};
use std::collections::HashSet;

/// Failed and successful tests collected from every report in a build.
///
/// A test name appears in at most one of the two lists. A failure always
/// wins: recording a failure removes an earlier success with the same name,
/// and a success is dropped when the name has already failed.
#[derive(Debug, Default)]
pub struct TestOutcomes {
    failed: Vec<TestCaseResult>,
    successful: Vec<TestCaseResult>,
    failed_names: HashSet<String>,
}

impl TestOutcomes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, case: ParsedTestCase) {
        match case.outcome {
            TestOutcome::Failed => self.record_failed(case.result),
            TestOutcome::Passed => self.record_successful(case.result),
            TestOutcome::Skipped => {}
        }
    }

    pub fn record_all(&mut self, cases: impl IntoIterator<Item = ParsedTestCase>) {
        for case in cases {
            self.record(case);
        }
    }

    pub fn record_failed(&mut self, result: TestCaseResult) {
        self.successful.retain(|s| s.name != result.name);
        self.failed_names.insert(result.name.clone());
        self.failed.push(result);
    }

    pub fn record_successful(&mut self, result: TestCaseResult) {
        if !self.failed_names.contains(&result.name) {
            self.successful.push(result);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failed.is_empty() && self.successful.is_empty()
    }

    pub fn into_job(self) -> TestJobResult {
        TestJobResult { failed_tests: self.failed, successful_tests: self.successful }
    }
}

#[cfg(test)]
#[path = "outcomes_tests.rs"]
mod tests;
