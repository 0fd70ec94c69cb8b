//! Read-back verification of an exported file.
//!
//! Two independent checks run in a fixed order: the row count of the file
//! against the row count of the query result, then the file's column set
//! against the catalog's. When the column sets agree the file is rewritten
//! in the catalog's declared column order.

use std::{collections::BTreeSet, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::debug;

use crate::{catalog::TableSchema, cli::QuoteStyle, export, io_utils, report::Discrepancy};

/// A re-read export: header names and raw field text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvSnapshot {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the snapshot with columns arranged as `order`. Every name in
    /// `order` must be present in the headers.
    pub fn reorder(&self, order: &[String]) -> Option<CsvSnapshot> {
        let positions = order
            .iter()
            .map(|name| self.headers.iter().position(|h| h == name))
            .collect::<Option<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|&idx| row.get(idx).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Some(CsvSnapshot {
            headers: order.to_vec(),
            rows,
        })
    }
}

pub fn read_snapshot(path: &Path) -> Result<CsvSnapshot> {
    let mut reader = io_utils::open_csv_reader_from_path(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("Reading headers from {path:?}"))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {:?}", idx + 2, path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(CsvSnapshot { headers, rows })
}

pub fn check_row_count(table: &str, db_rows: usize, csv_rows: usize) -> Option<Discrepancy> {
    (db_rows != csv_rows).then(|| Discrepancy::RowCount {
        table: table.to_string(),
        db_rows,
        csv_rows,
    })
}

/// Order-insensitive comparison of the two column sets.
pub fn check_columns(
    table: &str,
    db_columns: &[String],
    csv_columns: &[String],
) -> Option<Discrepancy> {
    let db_set = db_columns.iter().collect::<BTreeSet<_>>();
    let csv_set = csv_columns.iter().collect::<BTreeSet<_>>();
    if db_set == csv_set {
        return None;
    }
    let db_only = db_columns
        .iter()
        .filter(|c| !csv_set.contains(c))
        .unique()
        .cloned()
        .collect();
    let csv_only = csv_columns
        .iter()
        .filter(|c| !db_set.contains(c))
        .unique()
        .cloned()
        .collect();
    Some(Discrepancy::ColumnSet {
        table: table.to_string(),
        db_columns: db_columns.to_vec(),
        csv_columns: csv_columns.to_vec(),
        db_only,
        csv_only,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub csv_rows: usize,
    pub row_count_ok: bool,
    pub columns_ok: bool,
    pub reordered: bool,
    pub discrepancies: Vec<Discrepancy>,
}

/// Re-reads `path`, runs both checks and, when the column sets match,
/// rewrites the file in declared column order.
pub fn verify_table(
    table: &str,
    schema: &TableSchema,
    db_rows: usize,
    path: &Path,
    quote_style: QuoteStyle,
) -> Result<Verification> {
    let snapshot = read_snapshot(path)?;
    let mut discrepancies = Vec::new();

    let row_check = check_row_count(table, db_rows, snapshot.row_count());
    let row_count_ok = row_check.is_none();
    discrepancies.extend(row_check);

    let db_columns = schema.column_names();
    let column_check = check_columns(table, &db_columns, &snapshot.headers);
    let columns_ok = column_check.is_none();
    let mut reordered = false;
    match column_check {
        Some(discrepancy) => discrepancies.push(discrepancy),
        None => {
            if let Some(ordered) = snapshot.reorder(&db_columns) {
                reordered = ordered.headers != snapshot.headers;
                debug!(
                    "Rewriting {:?} in declared column order (changed: {})",
                    path, reordered
                );
                export::write_records(path, &ordered.headers, &ordered.rows, quote_style)
                    .with_context(|| format!("Rewriting {path:?} in declared column order"))?;
            }
        }
    }

    Ok(Verification {
        csv_rows: snapshot.row_count(),
        row_count_ok,
        columns_ok,
        reordered,
        discrepancies,
    })
}
