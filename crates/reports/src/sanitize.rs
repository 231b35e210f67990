// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clean-up applied to report text before parsing

/// Remove `"\n\t"` sequences; some runners (Swift) emit them inside
/// attribute values, which breaks parsing.
pub fn strip_formatting_artifacts(content: &str) -> String {
    content.replace("\n\t", "")
}

/// Make report text acceptable to a strict XML 1.0 parser.
///
/// Drops a leading byte order mark, the XML declaration (the text is already
/// decoded, so a declared encoding such as `us-ascii` is meaningless) and
/// characters that XML 1.0 does not allow, such as terminal colour escapes.
pub fn sanitize_xml(content: &str) -> String {
    let mut text = content.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<?xml") {
        if let Some(end) = text.find("?>") {
            text = &text[end + 2..];
        }
    }
    text.chars().filter(|&c| is_xml_char(c)).collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
