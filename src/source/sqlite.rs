//! SQLite catalog reader. The configured database is the file path.

use std::path::Path;

use log::debug;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tokio::runtime::Runtime;

use super::{POOL_CONNECTION_TIMEOUT, build_runtime, bytes_to_text};
use crate::{
    catalog::{Catalog, ColumnDef, TableSchema, TableSnapshot},
    config::ConnectionConfig,
    data::Value,
    error::{SourceError, SourceResult},
};

pub struct SqliteSource {
    pool: SqlitePool,
    runtime: Runtime,
    include_views: bool,
    target: String,
}

impl SqliteSource {
    pub fn connect(config: &ConnectionConfig, include_views: bool) -> SourceResult<Self> {
        let target = config.display_target();
        let path = Path::new(&config.database);
        if !path.exists() {
            return Err(SourceError::Config(format!(
                "SQLite database {path:?} does not exist"
            )));
        }
        let runtime = build_runtime()?;
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);
        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(POOL_CONNECTION_TIMEOUT)
                    .connect_with(options),
            )
            .map_err(|e| SourceError::connect(target.clone(), e))?;

        runtime
            .block_on(sqlx::query("SELECT 1").fetch_one(&pool))
            .map_err(|e| SourceError::connect(target.clone(), e))?;

        Ok(Self {
            runtime,
            pool,
            include_views,
            target,
        })
    }

    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// SQLite values carry their storage class, so the decode order only
    /// has to cover the four non-null classes.
    fn decode_cell(table: &str, row: &SqliteRow, idx: usize) -> SourceResult<Option<Value>> {
        let raw = row
            .try_get_raw(idx)
            .map_err(|e| SourceError::query(format!("reading '{table}'"), e))?;
        if raw.is_null() {
            return Ok(None);
        }
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Ok(Some(Value::Integer(v)));
        }
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Ok(Some(Value::Float(v)));
        }
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return Ok(Some(Value::Text(v)));
        }
        if let Ok(v) = row.try_get_unchecked::<Vec<u8>, _>(idx) {
            return Ok(Some(Value::Text(bytes_to_text(v))));
        }
        Err(SourceError::Decode {
            table: table.to_string(),
            column: row.column(idx).name().to_string(),
            type_name: row.column(idx).type_info().name().to_string(),
        })
    }
}

impl Catalog for SqliteSource {
    fn describe(&self) -> String {
        self.target.clone()
    }

    fn list_tables(&self) -> SourceResult<Vec<String>> {
        let query = r#"
            SELECT name
            FROM sqlite_master
            WHERE (type = 'table' OR (? AND type = 'view'))
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;
        let rows: Vec<SqliteRow> = self
            .runtime
            .block_on(
                sqlx::query(query)
                    .bind(self.include_views)
                    .fetch_all(&self.pool),
            )
            .map_err(|e| SourceError::query("listing SQLite tables", e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| SourceError::query("listing SQLite tables", e))
            })
            .collect()
    }

    fn table_schema(&self, table: &str) -> SourceResult<TableSchema> {
        let context = format!("loading SQLite columns for '{table}'");
        let rows: Vec<SqliteRow> = self
            .runtime
            .block_on(
                sqlx::query("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
                    .bind(table)
                    .fetch_all(&self.pool),
            )
            .map_err(|e| SourceError::query(context.clone(), e))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("name")
                .map_err(|e| SourceError::query(context.clone(), e))?;
            let declared: String = row
                .try_get("type")
                .map_err(|e| SourceError::query(context.clone(), e))?;
            columns.push(ColumnDef::new(name, declared));
        }
        Ok(TableSchema::new(columns))
    }

    fn fetch_table(&self, table: &str) -> SourceResult<TableSnapshot> {
        let sql = format!("SELECT * FROM {}", Self::quote_ident(table));
        debug!("{sql}");
        let rows: Vec<SqliteRow> = self
            .runtime
            .block_on(sqlx::query(&sql).fetch_all(&self.pool))
            .map_err(|e| SourceError::query(format!("reading '{table}'"), e))?;

        let headers = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self.table_schema(table)?.column_names(),
        };
        let mut snapshot = TableSnapshot::new(headers);
        snapshot.rows.reserve(rows.len());
        for row in &rows {
            let cells = (0..row.len())
                .map(|idx| Self::decode_cell(table, row, idx))
                .collect::<SourceResult<Vec<_>>>()?;
            snapshot.rows.push(cells);
        }
        Ok(snapshot)
    }
}
