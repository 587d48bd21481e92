//! Pipe tables: row parsing, normalisation and the bordered grid.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::ansi::{visible_width, ColorScheme};
use crate::pattern::Evaluator;

static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("Invalid separator cell regex"));

/// Column alignment taken from the separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// A table after row normalisation.
///
/// Every row, the header included, has exactly `alignments.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableModel {
    /// Header cells; `None` when the table had no separator row.
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub alignments: Vec<Alignment>,
}

impl TableModel {
    /// Build a model from raw `| a | b |` lines.
    ///
    /// When the second line is a valid separator the first line is the
    /// header. Otherwise every line is a data row and every column is
    /// left-aligned. The first line fixes the column count.
    pub fn parse<S: AsRef<str>>(lines: &[S], evaluator: &Evaluator) -> Self {
        let mut raw: Vec<Vec<String>> = lines.iter().map(|l| split_row(l.as_ref())).collect();
        let columns = raw.first().map_or(0, Vec::len);

        let alignments = raw
            .get(1)
            .and_then(|row| separator_alignments(row, evaluator));

        let (header, alignments) = match alignments {
            Some(mut aligns) => {
                raw.remove(1);
                let header = normalize(raw.remove(0), columns);
                aligns.resize(columns, Alignment::Left);
                (Some(header), aligns)
            }
            None => (None, vec![Alignment::Left; columns]),
        };

        let rows = raw.into_iter().map(|r| normalize(r, columns)).collect();
        Self {
            header,
            rows,
            alignments,
        }
    }

    pub fn columns(&self) -> usize {
        self.alignments.len()
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    /// Lay the table out as bordered lines.
    ///
    /// `format` styles each cell; widths are measured on its output.
    pub fn render<F>(&self, scheme: &ColorScheme, mut format: F) -> Vec<String>
    where
        F: FnMut(&str) -> String,
    {
        let header: Option<Vec<String>> = self
            .header
            .as_ref()
            .map(|cells| cells.iter().map(|c| format(c)).collect());
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| format(c)).collect())
            .collect();

        let mut widths = vec![0usize; self.columns()];
        for row in header.iter().chain(rows.iter()) {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(visible_width(cell));
            }
        }

        let mut border = String::from("+");
        for w in &widths {
            border.push_str(&"-".repeat(w + 2));
            border.push('+');
        }
        let border = format!("{}{}{}", scheme.table_border, border, scheme.reset);

        let mut out = Vec::with_capacity(rows.len() + 4);
        out.push(border.clone());
        if let Some(header) = &header {
            out.push(self.render_row(header, &widths, scheme));
            out.push(border.clone());
        }
        for row in &rows {
            out.push(self.render_row(row, &widths, scheme));
        }
        out.push(border);
        out
    }

    fn render_row(&self, cells: &[String], widths: &[usize], scheme: &ColorScheme) -> String {
        let mut line = format!("{}|", scheme.table_border);
        for ((cell, &width), align) in cells.iter().zip(widths).zip(&self.alignments) {
            let pad = width.saturating_sub(visible_width(cell));
            let (left, right) = match align {
                Alignment::Left => (0, pad),
                Alignment::Right => (pad, 0),
                Alignment::Center => (pad / 2, pad - pad / 2),
            };
            line.push(' ');
            line.push_str(&" ".repeat(left));
            line.push_str(cell);
            line.push_str(scheme.reset);
            line.push_str(&" ".repeat(right));
            line.push_str(scheme.table_border);
            line.push_str(" |");
        }
        line.push_str(scheme.reset);
        line
    }
}

/// Split a raw row into trimmed cells. One outer pipe on each side is
/// dropped; `\|` does not split.
pub fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                cell.push(c);
                if let Some(next) = chars.next() {
                    cell.push(next);
                }
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn separator_alignments(row: &[String], evaluator: &Evaluator) -> Option<Vec<Alignment>> {
    if row.is_empty() {
        return None;
    }
    row.iter()
        .map(|cell| {
            if !evaluator.is_match(&SEPARATOR_CELL, cell) {
                return None;
            }
            Some(match (cell.starts_with(':'), cell.ends_with(':')) {
                (true, true) => Alignment::Center,
                (false, true) => Alignment::Right,
                _ => Alignment::Left,
            })
        })
        .collect()
}

fn normalize(mut row: Vec<String>, columns: usize) -> Vec<String> {
    row.resize(columns, String::new());
    row
}
