// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Walks the results archive copied out of a build container

use crate::junit::parse_junit;
use crate::outcomes::TestOutcomes;
use crate::sanitize::strip_formatting_artifacts;
use crate::static_analysis::{parse_static_analysis_report, tool_for_file};
use lci_core::{StaticCodeAnalysisReport, TestJobResult};
use std::io::{self, Read};

/// Everything recovered from one results archive
#[derive(Debug, Default)]
pub struct ParsedResults {
    pub tests: TestJobResult,
    pub static_code_analysis_reports: Vec<StaticCodeAnalysisReport>,
}

/// The final path segment of an archive entry
pub fn report_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether an archive entry is a report worth parsing: an `.xml` file that
/// is not a Maven `pom.xml`.
pub fn is_report_file(path: &str) -> bool {
    let name = report_file_name(path);
    name.ends_with(".xml") && name != "pom.xml"
}

/// Parse every report in a tar stream.
///
/// A report that fails to parse is skipped and described through `log`;
/// the other reports are still parsed. Only a broken archive is an error.
pub fn parse_results_archive<R: Read>(
    reader: R,
    mut log: impl FnMut(String),
) -> io::Result<ParsedResults> {
    let mut archive = tar::Archive::new(reader);
    let mut outcomes = TestOutcomes::new();
    let mut reports = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let path = entry.path()?.to_string_lossy().into_owned();
        if !is_report_file(&path) {
            continue;
        }
        let name = report_file_name(&path).to_string();

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        let content = String::from_utf8_lossy(&bytes);

        if tool_for_file(&name).is_some() {
            match parse_static_analysis_report(&name, &content) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "static code analysis report rejected");
                    log(format!("Failed to parse static code analysis report for {name}"));
                    log(format!("Error while parsing report file {name}, ignoring."));
                }
            }
            continue;
        }

        let content = strip_formatting_artifacts(&content);
        if content.trim().is_empty() {
            log(format!("The file {name} does not contain any testcases."));
            continue;
        }
        match parse_junit(&content) {
            Ok(cases) if cases.is_empty() => {
                log(format!("The file {name} does not contain any testcases."));
            }
            Ok(cases) => outcomes.record_all(cases),
            Err(e) => {
                tracing::warn!(file = %path, error = %e, "test report rejected");
                log(format!("Error while parsing report file {name}, ignoring."));
            }
        }
    }

    Ok(ParsedResults { tests: outcomes.into_job(), static_code_analysis_reports: reports })
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
