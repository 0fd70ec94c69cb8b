//! I/O utilities for CSV reading, writing and export file naming.
//!
//! All file I/O in export-verify flows through this module:
//!
//! - **Writers** are UTF-8, comma-delimited, with the configured quote style.
//!   Fields containing the delimiter, a quote or a line break are always
//!   quoted so they cannot break row boundaries.
//! - **Readers** are flexible about field counts so a damaged file still
//!   yields a row count instead of aborting the run.
//! - **File names** are derived from table names with path-unsafe
//!   characters replaced.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::cli::QuoteStyle;

pub const CSV_DELIMITER: u8 = b',';
pub const CSV_EXTENSION: &str = "csv";

pub fn open_csv_reader<R>(reader: R, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(CSV_DELIMITER)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let reader =
        BufReader::new(File::open(path).with_context(|| format!("Opening export file {path:?}"))?);
    Ok(open_csv_reader(reader, true))
}

pub fn csv_writer<W>(writer: W, quote_style: QuoteStyle) -> csv::Writer<W>
where
    W: Write,
{
    let style = match quote_style {
        QuoteStyle::Necessary => csv::QuoteStyle::Necessary,
        QuoteStyle::Always => csv::QuoteStyle::Always,
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(CSV_DELIMITER)
        .quote_style(style)
        .double_quote(true);
    builder.from_writer(writer)
}

pub fn open_csv_writer(
    path: &Path,
    quote_style: QuoteStyle,
) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).with_context(|| format!("Creating export file {path:?}"))?;
    Ok(csv_writer(BufWriter::new(file), quote_style))
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Creating output directory {dir:?}"))
}

/// Maps a table name to a file stem that stays inside the output directory.
pub fn safe_file_stem(table: &str) -> String {
    let mut stem = table
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();
    if stem.starts_with('.') {
        stem.replace_range(..1, "_");
    }
    if stem.is_empty() {
        stem.push('_');
    }
    stem
}

pub fn export_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{}.{CSV_EXTENSION}", safe_file_stem(table)))
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut reader =
        BufReader::new(File::open(path).with_context(|| format!("Opening {path:?} for hashing"))?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("Hashing {path:?}"))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}
