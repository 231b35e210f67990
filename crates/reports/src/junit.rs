// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JUnit-style XML test report parsing
//!
//! Test names are qualified by the names of the nested suites that contain
//! them. The outermost suite (or the single suite under a `<testsuites>`
//! wrapper) only names the report file and does not contribute a prefix.

use crate::error::ReportError;
use crate::sanitize::sanitize_xml;
use lci_core::TestCaseResult;
use roxmltree::{Document, Node, ParsingOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTestCase {
    pub result: TestCaseResult,
    pub outcome: TestOutcome,
}

/// Parse one JUnit report into its test cases, in document order.
pub fn parse_junit(xml: &str) -> Result<Vec<ParsedTestCase>, ReportError> {
    let text = sanitize_xml(xml);
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(&text, options)?;
    let root = doc.root_element();

    let mut cases = Vec::new();
    match root.tag_name().name() {
        "testsuites" => {
            let suites: Vec<Node> = elements(root, "testsuite").collect();
            let named_top_level = suites.len() > 1;
            for suite in suites {
                let prefix = if named_top_level { suite_name(suite) } else { None };
                collect_suite(suite, prefix.as_deref(), &mut cases);
            }
            for case in elements(root, "testcase") {
                cases.push(parse_case(case, None));
            }
        }
        "testsuite" => collect_suite(root, None, &mut cases),
        other => return Err(ReportError::UnexpectedRoot(other.to_string())),
    }
    Ok(cases)
}

fn collect_suite(suite: Node, prefix: Option<&str>, out: &mut Vec<ParsedTestCase>) {
    for child in suite.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "testcase" => out.push(parse_case(child, prefix)),
            "testsuite" => {
                let nested = match suite_name(child) {
                    Some(name) => Some(qualify(prefix, &name)),
                    None => prefix.map(str::to_string),
                };
                collect_suite(child, nested.as_deref(), out);
            }
            _ => {}
        }
    }
}

fn parse_case(case: Node, prefix: Option<&str>) -> ParsedTestCase {
    let name = qualify(prefix, case.attribute("name").unwrap_or_default());
    let classname = case.attribute("classname").map(str::to_string);

    let mut messages = Vec::new();
    let mut failed = false;
    let mut skipped = false;
    for child in case.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "failure" | "error" => {
                failed = true;
                messages.push(failure_message(child));
            }
            "skipped" => skipped = true,
            _ => {}
        }
    }

    let outcome = if failed {
        TestOutcome::Failed
    } else if skipped {
        TestOutcome::Skipped
    } else {
        TestOutcome::Passed
    };
    ParsedTestCase { result: TestCaseResult::new(name, classname, messages), outcome }
}

/// The `message` attribute when present, otherwise the element's trimmed
/// text (including CDATA sections).
fn failure_message(node: Node) -> String {
    match node.attribute("message") {
        Some(message) => message.to_string(),
        None => node
            .descendants()
            .filter(Node::is_text)
            .filter_map(|n| n.text())
            .collect::<String>()
            .trim()
            .to_string(),
    }
}

fn suite_name(suite: Node) -> Option<String> {
    suite.attribute("name").filter(|name| !name.is_empty()).map(str::to_string)
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{name}"),
        None => name.to_string(),
    }
}

fn elements<'a, 'input>(
    parent: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    parent.children().filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

#[cfg(test)]
#[path = "junit_tests.rs"]
mod tests;
