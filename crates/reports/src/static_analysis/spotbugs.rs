// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SpotBugs XML (`spotbugsXml.xml`) reports

use super::{children, number, required, text_of};
use crate::error::ReportError;
use lci_core::StaticCodeAnalysisIssue;
use roxmltree::Node;

pub(super) fn parse(root: Node) -> Result<Vec<StaticCodeAnalysisIssue>, ReportError> {
    let source_dirs: Vec<String> = children(root, "Project")
        .flat_map(|project| children(project, "SrcDir"))
        .map(text_of)
        .collect();

    let mut issues = Vec::new();
    for bug in children(root, "BugInstance") {
        // Direct SourceLine is the primary location
        let Some(line) = children(bug, "SourceLine").next() else {
            continue;
        };
        let source_path = required(line, "sourcepath")?;
        let message = children(bug, "LongMessage")
            .chain(children(bug, "ShortMessage"))
            .map(text_of)
            .next()
            .unwrap_or_default();

        issues.push(StaticCodeAnalysisIssue {
            file_path: resolve(&source_dirs, source_path),
            start_line: number(line, "start")?,
            end_line: number(line, "end")?,
            start_column: None,
            end_column: None,
            rule: required(bug, "type")?.to_string(),
            category: bug.attribute("category").unwrap_or_default().to_string(),
            message,
            priority: bug.attribute("priority").map(str::to_string),
        });
    }
    Ok(issues)
}

/// Prefix the relative source path with the project's source directory when
/// exactly one is listed.
fn resolve(source_dirs: &[String], source_path: &str) -> String {
    match source_dirs.first() {
        Some(dir) if source_dirs.len() == 1 => {
            format!("{}/{source_path}", dir.trim_end_matches('/'))
        }
        _ => source_path.to_string(),
    }
}
