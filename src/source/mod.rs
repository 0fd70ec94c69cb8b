//! Database backends implementing [`Catalog`].
//!
//! sqlx is async; each backend owns a current-thread tokio runtime and
//! blocks on it, so callers stay synchronous and tables are processed one at
//! a time.

pub mod mysql;
pub mod sqlite;

use std::time::Duration;

use log::info;
use tokio::runtime::{Builder, Runtime};

use crate::{
    catalog::Catalog,
    cli::Driver,
    config::ConnectionConfig,
    error::{SourceError, SourceResult},
};

pub use mysql::MysqlSource;
pub use sqlite::SqliteSource;

/// Connection pool acquire timeout.
pub(crate) const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens the configured database. Failure here is fatal for the run.
pub fn connect(config: &ConnectionConfig, include_views: bool) -> SourceResult<Box<dyn Catalog>> {
    let catalog: Box<dyn Catalog> = match config.driver {
        Driver::Mysql => Box::new(MysqlSource::connect(config, include_views)?),
        Driver::Sqlite => Box::new(SqliteSource::connect(config, include_views)?),
    };
    info!("Connected to {}", catalog.describe());
    Ok(catalog)
}

pub(crate) fn build_runtime() -> SourceResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(SourceError::Runtime)
}

/// Renders bytes that are not valid UTF-8 as a `0x`-prefixed hex literal.
pub(crate) fn bytes_to_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("0x");
            for byte in bytes {
                hex.push_str(&format!("{byte:02x}"));
            }
            hex
        }
    }
}
