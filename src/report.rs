//! Run report: per-table outcomes, discrepancies and the summary counters.
//!
//! The report is built once from the finished table outcomes and never
//! mutated afterwards; the summary is a fold over the discrepancies.

use std::{
    fmt,
    fmt::Write as _,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::coerce::ColumnCoercion;

pub const SUCCESS_LINE: &str = "All tables, rows, and columns are the same as the DB tables.";

pub const EXIT_OK: i32 = 0;
pub const EXIT_DISCREPANCIES: i32 = 2;

/// One detected difference between a database table and its export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    RowCount {
        table: String,
        db_rows: usize,
        csv_rows: usize,
    },
    ColumnSet {
        table: String,
        db_columns: Vec<String>,
        csv_columns: Vec<String>,
        db_only: Vec<String>,
        csv_only: Vec<String>,
    },
    Coercion {
        table: String,
        column: String,
        declared_type: String,
        fallbacks: usize,
        failures: usize,
    },
}

impl Discrepancy {
    pub fn is_row_count(&self) -> bool {
        matches!(self, Discrepancy::RowCount { .. })
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::RowCount {
                table,
                db_rows,
                csv_rows,
            } => write!(
                f,
                "Row count mismatch in '{table}': DB has {db_rows} rows, CSV has {csv_rows} rows."
            ),
            Discrepancy::ColumnSet {
                table,
                db_columns,
                csv_columns,
                db_only,
                csv_only,
            } => write!(
                f,
                "Column mismatch in '{table}': DB has columns {db_columns:?} vs. CSV has columns {csv_columns:?} (DB only: {db_only:?}; CSV only: {csv_only:?})"
            ),
            Discrepancy::Coercion {
                table,
                column,
                declared_type,
                fallbacks,
                failures,
            } => write!(
                f,
                "Coercion issues in '{table}' column '{column}' ({declared_type}): {fallbacks} value(s) kept uncast, {failures} value(s) set missing."
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub mismatches: usize,
    pub row_count_discrepancies: usize,
}

impl SummaryCounts {
    pub fn from_discrepancies<'a, I>(discrepancies: I) -> Self
    where
        I: IntoIterator<Item = &'a Discrepancy>,
    {
        discrepancies
            .into_iter()
            .fold(Self::default(), |acc, discrepancy| Self {
                mismatches: acc.mismatches + 1,
                row_count_discrepancies: acc.row_count_discrepancies
                    + usize::from(discrepancy.is_row_count()),
            })
    }
}

/// Everything learned about one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    pub table: String,
    pub file: PathBuf,
    pub db_rows: usize,
    pub csv_rows: usize,
    pub row_count_ok: bool,
    pub columns_ok: bool,
    pub reordered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub coercion: Vec<ColumnCoercion>,
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: String,
    pub output_dir: PathBuf,
    pub tables: Vec<TableOutcome>,
    /// Tables requested by name that the catalog does not contain.
    pub unknown_tables: Vec<String>,
    pub summary: SummaryCounts,
}

impl RunReport {
    pub fn new(
        target: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        tables: Vec<TableOutcome>,
        unknown_tables: Vec<String>,
    ) -> Self {
        let summary =
            SummaryCounts::from_discrepancies(tables.iter().flat_map(|t| t.discrepancies.iter()));
        Self {
            target: target.into(),
            output_dir: output_dir.into(),
            tables,
            unknown_tables,
            summary,
        }
    }

    pub fn discrepancies(&self) -> impl Iterator<Item = &Discrepancy> {
        self.tables.iter().flat_map(|t| t.discrepancies.iter())
    }

    /// Tables whose row count matched.
    pub fn verified_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.row_count_ok)
            .map(|t| t.table.as_str())
            .collect()
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        let mut discrepancies = self.discrepancies().peekable();
        if discrepancies.peek().is_some() {
            let _ = writeln!(output, "Mismatch Report:");
            for discrepancy in discrepancies {
                let _ = writeln!(output, "{discrepancy}");
            }
        } else {
            let _ = writeln!(output, "{SUCCESS_LINE}");
        }
        let _ = writeln!(output);
        let _ = writeln!(output, "--- Summary Report ---");
        let _ = writeln!(output, "Total mismatches found: {}", self.summary.mismatches);
        let _ = writeln!(
            output,
            "Total row count discrepancies: {}",
            self.summary.row_count_discrepancies
        );
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).context("Writing report JSON")
    }

    pub fn exit_code(&self) -> i32 {
        if self.summary.mismatches == 0 {
            EXIT_OK
        } else {
            EXIT_DISCREPANCIES
        }
    }
}
