// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report parsing errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unexpected root element <{0}>")]
    UnexpectedRoot(String),

    #[error("no static code analysis parser for {0}")]
    UnsupportedTool(String),

    #[error("invalid report: {0}")]
    InvalidFormat(String),
}
