pub mod audit;
pub mod catalog;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod io_utils;
pub mod report;
pub mod source;
pub mod table;
pub mod verify;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{Cli, Commands},
    config::{CatalogConfig, ExportConfig},
    report::EXIT_OK,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("export_verify", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Runs the command line and returns the process exit code.
pub fn run() -> Result<i32> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Export(args) => handle_export(&args),
        Commands::Catalog(args) => handle_catalog(&args),
    }
}

fn handle_export(args: &cli::ExportArgs) -> Result<i32> {
    let config = ExportConfig::resolve(args)?;
    info!(
        "Exporting {} to {:?}",
        config.connection.display_target(),
        config.options.output_dir
    );
    let catalog = source::connect(&config.connection, config.filter.include_views)
        .context("Connecting to the database")?;
    let report = audit::run_audit(catalog.as_ref(), &config.filter, &config.options)?;

    report.print();
    if let Some(path) = &config.report {
        report
            .save_json(path)
            .with_context(|| format!("Writing report to {path:?}"))?;
        info!("Run report written to {path:?}");
    }
    Ok(report.exit_code())
}

fn handle_catalog(args: &cli::CatalogArgs) -> Result<i32> {
    let config = CatalogConfig::resolve(&args.connection)?;
    let catalog = source::connect(&config.connection, config.filter.include_views)
        .context("Connecting to the database")?;
    let tables = catalog.list_tables().context("Listing tables")?;
    let (selected, unknown) = config.filter.apply(tables);
    for name in &unknown {
        warn!("Table '{name}' was requested but does not exist");
    }

    let mut rows = Vec::new();
    for name in &selected {
        let schema = catalog
            .table_schema(name)
            .with_context(|| format!("Describing table '{name}'"))?;
        rows.extend(table::catalog_rows(name, &schema));
    }
    print!("{}", table::render_table(&table::catalog_headers(), &rows));
    info!(
        "Listed {} column(s) across {} table(s)",
        rows.len(),
        selected.len()
    );
    Ok(EXIT_OK)
}
