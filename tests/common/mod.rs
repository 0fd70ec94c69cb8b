#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Reads an exported file from `dir` relative to the workspace.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(relative)).expect("read workspace file")
    }

    /// Creates an SQLite database under the workspace by running `statements`.
    pub fn sqlite_db(&self, name: &str, statements: &[&str]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        create_sqlite_db(&path, statements);
        path
    }
}

pub fn create_sqlite_db(path: &Path, statements: &[&str]) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    runtime.block_on(async {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .expect("open sqlite database");
        for statement in statements {
            sqlx::query(statement)
                .execute(&mut conn)
                .await
                .unwrap_or_else(|e| panic!("executing {statement}: {e}"));
        }
        conn.close().await.expect("close sqlite database");
    });
}

/// The `orders` scenario: three rows, one NULL total.
pub const ORDERS: &[&str] = &[
    "CREATE TABLE orders (id INTEGER PRIMARY KEY, total DECIMAL(10,2), created_at DATETIME)",
    "INSERT INTO orders VALUES (1, 10.50, '2024-01-05 10:00:00')",
    "INSERT INTO orders VALUES (2, NULL, '2024-01-06 11:30:00')",
    "INSERT INTO orders VALUES (3, 7.25, '2024-01-07 09:15:00')",
];

pub const ORDERS_CSV: &str = "id,total,created_at\n1,10.5,2024-01-05 10:00:00\n2,,2024-01-06 11:30:00\n3,7.25,2024-01-07 09:15:00\n";

/// Free text with delimiters, quotes and line breaks inside values.
pub const NOTES: &[&str] = &[
    "CREATE TABLE notes (id INTEGER, body TEXT, author VARCHAR(40))",
    "INSERT INTO notes VALUES (1, 'plain', 'ann')",
    "INSERT INTO notes VALUES (2, 'comma, inside', 'bob')",
    "INSERT INTO notes VALUES (3, 'line one\nline two', NULL)",
    "INSERT INTO notes VALUES (4, 'she said \"hi\"', 'cy')",
];
