// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Column-aligned renderer for the `lci` list views.

use std::io::Write;

use crate::color;

pub enum Align {
    Left,
    Right,
}

/// How a cell's text is styled after padding.
pub enum CellStyle {
    Plain,
    Muted,
    /// Green/yellow/red by build or agent status.
    Status,
}

pub struct Column {
    pub name: &'static str,
    pub align: Align,
    pub style: CellStyle,
    /// Values longer than this are truncated.
    pub max_width: Option<usize>,
}

impl Column {
    fn new(name: &'static str, align: Align, style: CellStyle) -> Self {
        Self {
            name,
            align,
            style,
            max_width: None,
        }
    }

    pub fn left(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Plain)
    }

    pub fn right(name: &'static str) -> Self {
        Self::new(name, Align::Right, CellStyle::Plain)
    }

    pub fn muted(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Muted)
    }

    pub fn status(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Status)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }

    /// Pad `text` to `width`; a trailing left-aligned column is never padded.
    fn fit(&self, text: &str, width: usize, is_last: bool) -> String {
        let text = truncate(text, self.max_width);
        match self.align {
            Align::Left if is_last => text.to_string(),
            Align::Left => format!("{:<width$}", text),
            Align::Right => format!("{:>width$}", text),
        }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    colorize: bool,
}

const SEP: &str = "  ";

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self::with_color(columns, color::should_colorize())
    }

    fn with_color(columns: Vec<Column>, colorize: bool) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize,
        }
    }

    #[cfg(test)]
    pub fn plain(columns: Vec<Column>) -> Self {
        Self::with_color(columns, false)
    }

    #[cfg(test)]
    pub fn colored(columns: Vec<Column>) -> Self {
        Self::with_color(columns, true)
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Write header and rows. Color is applied after padding so escape
    /// sequences do not count towards column widths.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }
        let widths = self.widths();
        let last = self.columns.len().saturating_sub(1);

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let padded = col.fit(col.name, widths[i], i == last);
                if self.colorize {
                    color::apply_header(&padded)
                } else {
                    padded
                }
            })
            .collect();
        let _ = writeln!(out, "{}", header.join(SEP));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let raw = row.get(i).map(String::as_str).unwrap_or("");
                    let padded = col.fit(raw, widths[i], i == last);
                    self.stylize(padded, &col.style)
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(SEP));
        }
    }

    pub fn print(&self) {
        self.render(&mut std::io::stdout().lock());
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                self.rows
                    .iter()
                    .map(|row| {
                        let len = row.get(i).map_or(0, String::len);
                        col.max_width.map_or(len, |max| len.min(max))
                    })
                    .fold(col.name.len(), usize::max)
            })
            .collect()
    }

    fn stylize(&self, text: String, style: &CellStyle) -> String {
        if !self.colorize {
            return text;
        }
        match style {
            CellStyle::Plain => text,
            CellStyle::Muted => color::apply_muted(&text),
            CellStyle::Status => color::apply_status(&text),
        }
    }
}

fn truncate(s: &str, max: Option<usize>) -> &str {
    match max {
        Some(m) if s.len() > m => s.get(..m).unwrap_or(s),
        _ => s,
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
