use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    catalog::TableSnapshot, cli::QuoteStyle, config::ExportOptions, data::render_cell, io_utils,
};

/// Writes a header row followed by `rows`, replacing any existing file.
/// Returns the number of data rows written.
pub fn write_records<I, R>(
    path: &Path,
    headers: &[String],
    rows: I,
    quote_style: QuoteStyle,
) -> Result<usize>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = io_utils::open_csv_writer(path, quote_style)?;
    writer
        .write_record(headers)
        .with_context(|| format!("Writing headers to {path:?}"))?;
    let mut written = 0usize;
    for row in rows {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row {} to {:?}", written + 2, path))?;
        written += 1;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing {path:?}"))?;
    Ok(written)
}

/// Serializes a snapshot in its current column order, rendering absent
/// values as the configured missing marker.
pub fn write_snapshot(
    snapshot: &TableSnapshot,
    path: &Path,
    options: &ExportOptions,
) -> Result<usize> {
    let marker = options.missing_marker.as_str();
    let rows = snapshot.rows.iter().map(|row| {
        row.iter()
            .map(|cell| render_cell(cell.as_ref(), marker))
            .collect::<Vec<_>>()
    });
    write_records(path, &snapshot.headers, rows, options.quote_style)
}
