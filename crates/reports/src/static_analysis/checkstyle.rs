// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkstyle XML format, also written by SwiftLint's checkstyle reporter

use super::{children, number, required};
use crate::error::ReportError;
use lci_core::StaticCodeAnalysisIssue;
use roxmltree::Node;

pub(super) fn parse(root: Node) -> Result<Vec<StaticCodeAnalysisIssue>, ReportError> {
    let mut issues = Vec::new();
    for file in children(root, "file") {
        let path = required(file, "name")?;
        for error in children(file, "error") {
            let line = number(error, "line")?;
            let (category, rule) = split_source(error.attribute("source").unwrap_or_default());
            issues.push(StaticCodeAnalysisIssue {
                file_path: path.to_string(),
                start_line: line,
                end_line: line,
                start_column: number(error, "column")?,
                end_column: None,
                rule,
                category,
                message: error.attribute("message").unwrap_or_default().to_string(),
                priority: error.attribute("severity").map(str::to_string),
            });
        }
    }
    Ok(issues)
}

/// Split a check source into its category and rule name.
///
/// `com.puppycrawl.tools.checkstyle.checks.naming.MethodNameCheck` becomes
/// (`naming`, `MethodName`); SwiftLint's `swiftlint.rules.line_length` becomes
/// (`rules`, `line_length`).
fn split_source(source: &str) -> (String, String) {
    let mut segments = source.rsplit('.');
    let check = segments.next().unwrap_or_default();
    let category = segments.next().unwrap_or("miscellaneous");
    let rule = check.strip_suffix("Check").unwrap_or(check);
    (category.to_string(), rule.to_string())
}
