//! Typed errors raised by the database layer.
//!
//! Everything above the source layer works with `anyhow::Result`; these
//! variants exist so a connection failure can be told apart from a failed
//! query on a single table.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Invalid or incomplete connection settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not reach or authenticate against the database.
    #[error("Failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// A catalog or data query failed.
    #[error("Query failed ({context}): {source}")]
    Query {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// A cell could not be decoded into any supported value.
    #[error("Cannot decode column '{column}' of table '{table}' (type {type_name})")]
    Decode {
        table: String,
        column: String,
        type_name: String,
    },

    /// The async runtime backing the connection pool could not start.
    #[error("Failed to start database runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl SourceError {
    pub fn connect(target: impl Into<String>, source: sqlx::Error) -> Self {
        SourceError::Connect {
            target: target.into(),
            source,
        }
    }

    pub fn query(context: impl Into<String>, source: sqlx::Error) -> Self {
        SourceError::Query {
            context: context.into(),
            source,
        }
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
