// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn render_to_string(table: &Table) -> String {
    let mut buf = Vec::new();
    table.render(&mut buf);
    String::from_utf8(buf).unwrap()
}

#[test]
fn empty_table_prints_nothing() {
    let table = Table::plain(vec![Column::left("ID"), Column::status("STATUS")]);
    assert_eq!(render_to_string(&table), "");
}

#[test]
fn columns_fit_the_widest_cell() {
    let mut table = Table::plain(vec![Column::left("ID"), Column::left("STATUS")]);
    table.row(vec!["job-1".into(), "queued".into()]);
    table.row(vec!["job-1234567".into(), "running".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "ID           STATUS");
    assert_eq!(lines[1], "job-1        queued");
    assert_eq!(lines[2], "job-1234567  running");
}

#[test]
fn right_aligned_middle_column() {
    let mut table = Table::plain(vec![
        Column::left("AGENT"),
        Column::right("SLOTS"),
        Column::left("STATUS"),
    ]);
    table.row(vec!["ci-1".into(), "1/2".into(), "active".into()]);
    table.row(vec!["ci-22".into(), "0/12".into(), "idle".into()]);
    let out = render_to_string(&table);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "AGENT  SLOTS  STATUS");
    assert_eq!(lines[1], "ci-1     1/2  active");
    assert_eq!(lines[2], "ci-22   0/12  idle");
}

#[test]
fn max_width_truncates() {
    let mut table = Table::plain(vec![Column::left("ID").with_max(8), Column::left("NAME")]);
    table.row(vec!["0f8fad5b-d9cb-469f".into(), "build".into()]);
    let out = render_to_string(&table);
    assert_eq!(out.lines().nth(1), Some("0f8fad5b  build"));
}

#[test]
fn last_column_has_no_trailing_padding() {
    let mut table = Table::plain(vec![Column::left("A"), Column::left("B")]);
    table.row(vec!["x".into(), "y".into()]);
    table.row(vec!["x".into(), "longer".into()]);
    let out = render_to_string(&table);
    assert_eq!(out.lines().nth(1), Some("x  y"));
}

#[test]
fn colored_table_styles_status_and_muted_cells() {
    let mut table = Table::colored(vec![Column::muted("ID"), Column::status("STATUS")]);
    table.row(vec!["job-1".into(), "failed".into()]);
    let out = render_to_string(&table);

    assert!(out.contains("\x1b[38;5;74m"), "header color missing: {out:?}");
    assert!(out.contains("\x1b[38;5;240m"), "muted color missing: {out:?}");
    assert!(out.contains("\x1b[31mfailed"), "status color missing: {out:?}");
}

#[test]
fn plain_table_has_no_escapes() {
    let mut table = Table::plain(vec![Column::muted("ID"), Column::status("STATUS")]);
    table.row(vec!["job-1".into(), "running".into()]);
    assert!(!render_to_string(&table).contains("\x1b["));
}
