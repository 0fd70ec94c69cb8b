//! The export-and-verify procedure.
//!
//! Tables are processed strictly one after another. For each table the
//! whole result set is read before it is counted, the file is written before
//! it is read back, and the column-set check runs before any reordering
//! rewrite. Query and I/O failures abort the run; discrepancies are recorded
//! and the run moves on.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::{
    catalog::Catalog,
    coerce,
    config::{ExportOptions, TableFilter},
    export, io_utils,
    report::{Discrepancy, RunReport, TableOutcome},
    verify,
};

pub fn run_audit(
    catalog: &dyn Catalog,
    filter: &TableFilter,
    options: &ExportOptions,
) -> Result<RunReport> {
    io_utils::ensure_dir(&options.output_dir)?;
    let tables = catalog
        .list_tables()
        .with_context(|| format!("Listing tables of {}", catalog.describe()))?;
    let (selected, unknown) = filter.apply(tables);
    for name in &unknown {
        warn!("Table '{name}' was requested but does not exist");
    }
    ensure_distinct_files(&selected)?;
    info!(
        "Exporting {} table(s) to {:?}",
        selected.len(),
        options.output_dir
    );

    let mut outcomes = Vec::with_capacity(selected.len());
    for table in &selected {
        outcomes.push(process_table(catalog, table, options)?);
    }
    Ok(RunReport::new(
        catalog.describe(),
        options.output_dir.clone(),
        outcomes,
        unknown,
    ))
}

/// Two tables must never share an export file, including on filesystems
/// that ignore case (`Orders` and `orders`).
fn ensure_distinct_files(tables: &[String]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for table in tables {
        let stem = io_utils::safe_file_stem(table);
        if let Some(previous) = seen.insert(stem.to_lowercase(), table) {
            bail!("Tables '{previous}' and '{table}' would both be exported to '{stem}.csv'");
        }
    }
    Ok(())
}

pub fn process_table(
    catalog: &dyn Catalog,
    table: &str,
    options: &ExportOptions,
) -> Result<TableOutcome> {
    let schema = catalog
        .table_schema(table)
        .with_context(|| format!("Describing table '{table}'"))?;
    let mut snapshot = catalog
        .fetch_table(table)
        .with_context(|| format!("Reading table '{table}'"))?;
    let db_rows = snapshot.row_count();
    let coercion = coerce::normalize_snapshot(table, &schema, &mut snapshot);

    let path = io_utils::export_path(&options.output_dir, table);
    if io_utils::safe_file_stem(table) != table {
        warn!("Table '{table}' contains path-unsafe characters; exporting to {path:?}");
    }
    export::write_snapshot(&snapshot, &path, options)
        .with_context(|| format!("Exporting table '{table}'"))?;
    drop(snapshot);

    let verification = verify::verify_table(table, &schema, db_rows, &path, options.quote_style)
        .with_context(|| format!("Verifying export of '{table}'"))?;
    let mut discrepancies = verification.discrepancies;
    if options.strict_coercion {
        discrepancies.extend(coercion.iter().filter(|c| c.has_problems()).map(|c| {
            Discrepancy::Coercion {
                table: table.to_string(),
                column: c.column.clone(),
                declared_type: c.declared_type.clone(),
                fallbacks: c.fallbacks,
                failures: c.failures,
            }
        }));
    }
    let sha256 = io_utils::file_sha256(&path)?;

    if discrepancies.is_empty() {
        info!("✓ '{table}': {db_rows} row(s) exported to {path:?}");
    } else {
        warn!(
            "'{table}': {} discrepancy(ies) found in {:?}",
            discrepancies.len(),
            path
        );
    }

    Ok(TableOutcome {
        table: table.to_string(),
        file: path,
        db_rows,
        csv_rows: verification.csv_rows,
        row_count_ok: verification.row_count_ok,
        columns_ok: verification.columns_ok,
        reordered: verification.reordered,
        sha256: Some(sha256),
        coercion,
        discrepancies,
    })
}
