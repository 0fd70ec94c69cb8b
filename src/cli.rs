use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Export database tables to CSV and verify each export",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export every table to CSV, then re-read and verify each file
    Export(ExportArgs),
    /// List tables with their columns, declared types and export categories
    Catalog(CatalogArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Mysql,
    Sqlite,
}

impl Driver {
    pub fn default_port(self) -> Option<u16> {
        match self {
            Driver::Mysql => Some(3306),
            Driver::Sqlite => None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Quote only fields containing the delimiter, quotes or line breaks
    #[default]
    Necessary,
    /// Quote every field
    Always,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// YAML configuration file; command-line flags override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Database driver
    #[arg(long, value_enum)]
    pub driver: Option<Driver>,
    /// Database host (mysql)
    #[arg(long)]
    pub host: Option<String>,
    /// Database port (mysql, defaults to 3306)
    #[arg(long)]
    pub port: Option<u16>,
    /// Database user (mysql)
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,
    /// Database password; EXPORT_VERIFY_PASSWORD is used when omitted
    #[arg(long)]
    pub password: Option<String>,
    /// Database (schema) name for mysql, database file path for sqlite
    #[arg(short = 'd', long = "database")]
    pub database: Option<String>,
    /// Include views alongside base tables
    #[arg(long = "include-views")]
    pub include_views: bool,
    /// Only process these tables (repeatable or comma-separated)
    #[arg(short = 't', long = "table", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub tables: Vec<String>,
    /// Skip these tables (repeatable or comma-separated)
    #[arg(long = "exclude", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Directory receiving one <table>.csv per table (created if absent)
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Text written for NULL values (defaults to an empty field)
    #[arg(long = "missing-marker")]
    pub missing_marker: Option<String>,
    /// Field quoting for the exported files
    #[arg(long = "quote-style", value_enum)]
    pub quote_style: Option<QuoteStyle>,
    /// Report columns with uncastable values as mismatches
    #[arg(long = "strict-coercion")]
    pub strict_coercion: bool,
    /// Write the full run report as JSON to this path
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}
