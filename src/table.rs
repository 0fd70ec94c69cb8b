//! Plain-text table rendering for the `catalog` command.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::catalog::TableSchema;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(sanitize_cell(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &separator_widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

/// One row per column: table, position, column, declared type, category.
pub fn catalog_rows(table: &str, schema: &TableSchema) -> Vec<Vec<String>> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                table.to_string(),
                (idx + 1).to_string(),
                column.name.clone(),
                column.declared_type.clone(),
                column.category().to_string(),
            ]
        })
        .collect()
}

pub fn catalog_headers() -> Vec<String> {
    ["table", "#", "column", "declared type", "category"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(sanitized.chars().count());
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
