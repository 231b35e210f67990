// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static code analysis reports
//!
//! Each supported tool writes a report with a fixed file name; the file
//! name alone selects the parser.

mod checkstyle;
mod pmd;
mod spotbugs;

use crate::error::ReportError;
use crate::sanitize::sanitize_xml;
use lci_core::{StaticCodeAnalysisIssue, StaticCodeAnalysisReport, StaticCodeAnalysisTool};
use roxmltree::{Document, Node, ParsingOptions};

type IssueParser = fn(Node) -> Result<Vec<StaticCodeAnalysisIssue>, ReportError>;

struct ToolParser {
    tool: StaticCodeAnalysisTool,
    file_name: &'static str,
    root: &'static str,
    parse: IssueParser,
}

const PARSERS: &[ToolParser] = &[
    ToolParser {
        tool: StaticCodeAnalysisTool::Checkstyle,
        file_name: "checkstyle-result.xml",
        root: "checkstyle",
        parse: checkstyle::parse,
    },
    ToolParser {
        tool: StaticCodeAnalysisTool::Swiftlint,
        file_name: "swiftlint-result.xml",
        root: "checkstyle",
        parse: checkstyle::parse,
    },
    ToolParser { tool: StaticCodeAnalysisTool::Pmd, file_name: "pmd.xml", root: "pmd", parse: pmd::parse },
    ToolParser {
        tool: StaticCodeAnalysisTool::PmdCpd,
        file_name: "cpd.xml",
        root: "pmd-cpd",
        parse: pmd::parse_cpd,
    },
    ToolParser {
        tool: StaticCodeAnalysisTool::Spotbugs,
        file_name: "spotbugsXml.xml",
        root: "BugCollection",
        parse: spotbugs::parse,
    },
];

fn parser_for(file_name: &str) -> Option<&'static ToolParser> {
    PARSERS.iter().find(|p| p.file_name == file_name)
}

/// The tool that produces reports with this file name, if any.
pub fn tool_for_file(file_name: &str) -> Option<StaticCodeAnalysisTool> {
    parser_for(file_name).map(|p| p.tool)
}

/// Parse a static code analysis report, choosing the parser by file name.
pub fn parse_static_analysis_report(
    file_name: &str,
    content: &str,
) -> Result<StaticCodeAnalysisReport, ReportError> {
    let parser =
        parser_for(file_name).ok_or_else(|| ReportError::UnsupportedTool(file_name.to_string()))?;

    let text = sanitize_xml(content);
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(&text, options)?;
    let root = doc.root_element();
    if root.tag_name().name() != parser.root {
        return Err(ReportError::UnexpectedRoot(root.tag_name().name().to_string()));
    }

    let issues = (parser.parse)(root)?;
    Ok(StaticCodeAnalysisReport { tool: parser.tool, issues })
}

fn number(node: Node, attribute: &str) -> Result<Option<u32>, ReportError> {
    match node.attribute(attribute) {
        None | Some("") => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            ReportError::InvalidFormat(format!(
                "<{}> has non-numeric {attribute}=\"{value}\"",
                node.tag_name().name()
            ))
        }),
    }
}

fn required<'a>(node: Node<'a, '_>, attribute: &str) -> Result<&'a str, ReportError> {
    node.attribute(attribute).ok_or_else(|| {
        ReportError::InvalidFormat(format!("<{}> is missing {attribute}", node.tag_name().name()))
    })
}

fn children<'a, 'input>(
    parent: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    parent.children().filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

fn text_of(node: Node) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
#[path = "../static_analysis_tests.rs"]
mod tests;
