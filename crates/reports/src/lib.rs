// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Parsing of build reports collected from a build container

mod archive;
mod error;
mod junit;
mod outcomes;
mod sanitize;
pub mod static_analysis;

pub use archive::{is_report_file, parse_results_archive, report_file_name, ParsedResults};
pub use error::ReportError;
pub use junit::{parse_junit, ParsedTestCase, TestOutcome};
pub use outcomes::TestOutcomes;
pub use sanitize::{sanitize_xml, strip_formatting_artifacts};
pub use static_analysis::{parse_static_analysis_report, tool_for_file};
