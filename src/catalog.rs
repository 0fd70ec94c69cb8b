//! Catalog model shared by every database backend.
//!
//! A [`Catalog`] lists tables, describes their columns in declared order and
//! reads a whole table into a [`TableSnapshot`]. Backends live under
//! [`crate::source`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{data::Value, error::SourceResult};

/// Normalized type family a declared column type maps to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Integer,
    Float,
    DateTime,
    Text,
}

impl TypeCategory {
    /// Classifies a declared type string by substring, first match wins:
    /// `int`, then `float`/`decimal`, then `datetime`. Matching ignores case.
    pub fn from_declared(declared: &str) -> Self {
        let lowered = declared.to_ascii_lowercase();
        if lowered.contains("int") {
            TypeCategory::Integer
        } else if lowered.contains("float") || lowered.contains("decimal") {
            TypeCategory::Float
        } else if lowered.contains("datetime") {
            TypeCategory::DateTime
        } else {
            TypeCategory::Text
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TypeCategory::Integer => "integer",
            TypeCategory::Float => "float",
            TypeCategory::DateTime => "datetime",
            TypeCategory::Text => "text",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    pub fn category(&self) -> TypeCategory {
        TypeCategory::from_declared(&self.declared_type)
    }
}

/// Columns of one table in the order the database declares them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// In-memory copy of one table's rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl TableSnapshot {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read access to a database's tables.
pub trait Catalog {
    /// Human readable target, never including credentials.
    fn describe(&self) -> String;

    /// Table names ordered by name.
    fn list_tables(&self) -> SourceResult<Vec<String>>;

    fn table_schema(&self, table: &str) -> SourceResult<TableSchema>;

    /// Reads every row of `table`. Headers follow the result set order.
    fn fetch_table(&self, table: &str) -> SourceResult<TableSnapshot>;
}
