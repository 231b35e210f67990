// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PMD violation reports and PMD-CPD duplication reports

use super::{children, number, required, text_of};
use crate::error::ReportError;
use lci_core::StaticCodeAnalysisIssue;
use roxmltree::Node;

const CPD_RULE: &str = "Copy/Paste Detection";

pub(super) fn parse(root: Node) -> Result<Vec<StaticCodeAnalysisIssue>, ReportError> {
    let mut issues = Vec::new();
    for file in children(root, "file") {
        let path = required(file, "name")?;
        for violation in children(file, "violation") {
            issues.push(StaticCodeAnalysisIssue {
                file_path: path.to_string(),
                start_line: number(violation, "beginline")?,
                end_line: number(violation, "endline")?,
                start_column: number(violation, "begincolumn")?,
                end_column: number(violation, "endcolumn")?,
                rule: required(violation, "rule")?.to_string(),
                category: violation.attribute("ruleset").unwrap_or_default().to_string(),
                message: text_of(violation),
                priority: violation.attribute("priority").map(str::to_string),
            });
        }
    }
    Ok(issues)
}

/// One issue per duplication, reported against the first file involved.
pub(super) fn parse_cpd(root: Node) -> Result<Vec<StaticCodeAnalysisIssue>, ReportError> {
    let mut issues = Vec::new();
    for duplication in children(root, "duplication") {
        let lines = number(duplication, "lines")?.unwrap_or_default();
        let mut locations = Vec::new();
        let mut first = None;
        for file in children(duplication, "file") {
            let path = required(file, "path")?;
            let start = number(file, "line")?;
            let end = number(file, "endline")?
                .or_else(|| start.map(|s| s + lines.saturating_sub(1)));
            locations.push(match (start, end) {
                (Some(s), Some(e)) => format!("{path}: {s}-{e}"),
                _ => path.to_string(),
            });
            if first.is_none() {
                first = Some((path, start, end, number(file, "column")?, number(file, "endcolumn")?));
            }
        }

        let Some((path, start_line, end_line, start_column, end_column)) = first else {
            return Err(ReportError::InvalidFormat("<duplication> lists no files".to_string()));
        };
        issues.push(StaticCodeAnalysisIssue {
            file_path: path.to_string(),
            start_line,
            end_line,
            start_column,
            end_column,
            rule: CPD_RULE.to_string(),
            category: CPD_RULE.to_string(),
            message: format!(
                "Code duplication of {lines} lines in the following files:\n{}",
                locations.join("\n")
            ),
            priority: None,
        });
    }
    Ok(issues)
}
