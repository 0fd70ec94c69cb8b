//! MySQL/MariaDB catalog reader.

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use rust_decimal::Decimal;
use sqlx::mysql::types::{MySqlTime, MySqlTimeSign};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tokio::runtime::Runtime;

use super::{POOL_CONNECTION_TIMEOUT, build_runtime, bytes_to_text};
use crate::{
    catalog::{Catalog, ColumnDef, TableSchema, TableSnapshot},
    config::ConnectionConfig,
    data::Value,
    error::{SourceError, SourceResult},
};

pub struct MysqlSource {
    // Declared before the runtime so the pool is dropped while it still exists.
    pool: MySqlPool,
    runtime: Runtime,
    database: String,
    include_views: bool,
    target: String,
}

impl MysqlSource {
    pub fn connect(config: &ConnectionConfig, include_views: bool) -> SourceResult<Self> {
        let target = config.display_target();
        let runtime = build_runtime()?;

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database)
            .ssl_mode(MySqlSslMode::Preferred);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = runtime
            .block_on(
                MySqlPoolOptions::new()
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
            database: config.database.clone(),
            include_views,
            target,
        })
    }

    fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn decode_row(table: &str, row: &MySqlRow) -> SourceResult<Vec<Option<Value>>> {
        (0..row.len())
            .map(|idx| Self::decode_cell(table, row, idx))
            .collect()
    }

    fn decode_cell(table: &str, row: &MySqlRow, idx: usize) -> SourceResult<Option<Value>> {
        let raw = row
            .try_get_raw(idx)
            .map_err(|e| SourceError::query(format!("reading '{table}'"), e))?;
        if raw.is_null() {
            return Ok(None);
        }

        let column = row.column(idx);
        let type_name = column.type_info().name();
        let decode_error = || SourceError::Decode {
            table: table.to_string(),
            column: column.name().to_string(),
            type_name: type_name.to_string(),
        };
        let Some(decoder) = Decoder::for_type(type_name) else {
            return Err(decode_error());
        };

        let value = match decoder {
            Decoder::Signed => row.try_get::<i64, _>(idx).ok().map(Value::Integer),
            Decoder::Unsigned => row.try_get_unchecked::<u64, _>(idx).ok().map(unsigned_value),
            Decoder::Single => row.try_get::<f32, _>(idx).ok().map(|v| Value::Float(widen(v))),
            Decoder::Double => row.try_get::<f64, _>(idx).ok().map(Value::Float),
            Decoder::Decimal => row
                .try_get::<Decimal, _>(idx)
                .map(|d| d.to_string())
                .or_else(|_| row.try_get_unchecked::<String, _>(idx))
                .ok()
                .map(Value::Text),
            Decoder::DateTime => match row.try_get::<NaiveDateTime, _>(idx) {
                Ok(v) => Some(Value::DateTime(v)),
                Err(_) => zero_temporal(row, idx, ZERO_DATETIME),
            },
            Decoder::Date => match row.try_get::<NaiveDate, _>(idx) {
                Ok(v) => Some(Value::Text(v.format("%Y-%m-%d").to_string())),
                Err(_) => zero_temporal(row, idx, ZERO_DATE),
            },
            // TIME spans -838:59:59 to 838:59:59, wider than a time of day.
            Decoder::Time => row
                .try_get::<MySqlTime, _>(idx)
                .ok()
                .map(|t| Value::Text(format_time(&t))),
            Decoder::Text => row
                .try_get::<String, _>(idx)
                .ok()
                .or_else(|| {
                    row.try_get_unchecked::<Vec<u8>, _>(idx)
                        .ok()
                        .map(bytes_to_text)
                })
                .map(Value::Text),
            Decoder::Binary => row
                .try_get_unchecked::<Vec<u8>, _>(idx)
                .ok()
                .map(|bytes| Value::Text(bytes_to_text(bytes))),
        };
        value.map(Some).ok_or_else(decode_error)
    }
}

const ZERO_DATETIME: &str = "0000-00-00 00:00:00";
const ZERO_DATE: &str = "0000-00-00";

/// Decoding strategy for a result column, keyed on the type name sqlx reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    Signed,
    Unsigned,
    Single,
    Double,
    Decimal,
    DateTime,
    Date,
    Time,
    Text,
    Binary,
}

impl Decoder {
    fn for_type(type_name: &str) -> Option<Self> {
        let upper = type_name.trim().to_ascii_uppercase();
        let (base, unsigned) = match upper.strip_suffix(" UNSIGNED") {
            Some(base) => (base, true),
            None => (upper.as_str(), false),
        };
        let decoder = match base {
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" if unsigned => {
                Decoder::Unsigned
            }
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Decoder::Signed,
            // YEAR and BIT arrive as unsigned integers; BIT is big-endian.
            "YEAR" | "BIT" => Decoder::Unsigned,
            "FLOAT" => Decoder::Single,
            "DOUBLE" => Decoder::Double,
            "DECIMAL" => Decoder::Decimal,
            "DATETIME" | "TIMESTAMP" => Decoder::DateTime,
            "DATE" => Decoder::Date,
            "TIME" => Decoder::Time,
            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" | "JSON" => Decoder::Text,
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB"
            | "GEOMETRY" => Decoder::Binary,
            _ => return None,
        };
        Some(decoder)
    }
}

fn unsigned_value(value: u64) -> Value {
    match i64::try_from(value) {
        Ok(signed) => Value::Integer(signed),
        Err(_) => Value::Text(value.to_string()),
    }
}

/// Widens through the shortest decimal form so `FLOAT` 1.1 stays 1.1.
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

/// Renders TIME the way the server prints it (`-01:30:00`, `36:00:00`).
fn format_time(time: &MySqlTime) -> String {
    let sign = match time.sign() {
        MySqlTimeSign::Negative => "-",
        MySqlTimeSign::Positive => "",
    };
    let mut out = format!(
        "{sign}{:02}:{:02}:{:02}",
        time.hours(),
        time.minutes(),
        time.seconds()
    );
    if time.microseconds() != 0 {
        out.push_str(&format!(".{:06}", time.microseconds()));
    }
    out
}

/// Zero dates (`0000-00-00`) have no chrono value; the wire form is a
/// zero-length binary value or an all-zero text literal.
fn is_zero_temporal(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
        || (bytes.contains(&b'0')
            && bytes
                .iter()
                .all(|b| matches!(b, b'0' | b'-' | b':' | b' ' | b'.')))
}

fn zero_temporal(row: &MySqlRow, idx: usize, rendered: &str) -> Option<Value> {
    row.try_get_unchecked::<Vec<u8>, _>(idx)
        .ok()
        .filter(|bytes| is_zero_temporal(bytes))
        .map(|_| Value::Text(rendered.to_string()))
}

impl Catalog for MysqlSource {
    fn describe(&self) -> String {
        self.target.clone()
    }

    fn list_tables(&self) -> SourceResult<Vec<String>> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ?
              AND (TABLE_TYPE = 'BASE TABLE' OR (? AND TABLE_TYPE = 'VIEW'))
            ORDER BY TABLE_NAME
        "#;
        let rows: Vec<MySqlRow> = self
            .runtime
            .block_on(
                sqlx::query(query)
                    .bind(&self.database)
                    .bind(self.include_views)
                    .fetch_all(&self.pool),
            )
            .map_err(|e| SourceError::query("listing MySQL tables", e))?;
        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("TABLE_NAME")
                    .map_err(|e| SourceError::query("listing MySQL tables", e))
            })
            .collect()
    }

    fn table_schema(&self, table: &str) -> SourceResult<TableSchema> {
        // COLUMN_TYPE carries the same string SHOW COLUMNS reports, e.g. int(11).
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(COLUMN_TYPE AS CHAR) AS COLUMN_TYPE
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
        let context = format!("loading MySQL columns for '{table}'");
        let rows: Vec<MySqlRow> = self
            .runtime
            .block_on(
                sqlx::query(query)
                    .bind(&self.database)
                    .bind(table)
                    .fetch_all(&self.pool),
            )
            .map_err(|e| SourceError::query(context.clone(), e))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("COLUMN_NAME")
                .map_err(|e| SourceError::query(context.clone(), e))?;
            let declared: String = row
                .try_get("COLUMN_TYPE")
                .map_err(|e| SourceError::query(context.clone(), e))?;
            columns.push(ColumnDef::new(name, declared));
        }
        Ok(TableSchema::new(columns))
    }

    fn fetch_table(&self, table: &str) -> SourceResult<TableSnapshot> {
        let sql = format!("SELECT * FROM {}", Self::quote_ident(table));
        debug!("{sql}");
        let rows: Vec<MySqlRow> = self
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
            snapshot.rows.push(Self::decode_row(table, row)?);
        }
        Ok(snapshot)
    }
}
