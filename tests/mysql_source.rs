//! Runs against a live MySQL server named by `EXPORT_VERIFY_TEST_MYSQL_*`
//! variables (`_DATABASE` required; `_HOST`, `_PORT`, `_USER`, `_PASSWORD`
//! optional). Run with: cargo test --test mysql_source -- --ignored

mod common;

use std::env;

use common::{ORDERS, ORDERS_CSV, TestWorkspace};
use export_verify::{
    audit,
    catalog::{Catalog, TypeCategory},
    cli::Driver,
    config::{ConnectionConfig, ExportOptions, TableFilter},
    data::Value,
    source::MysqlSource,
};
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};

const TABLES: &[&str] = &[
    "orders",
    "empty_things",
    "durations",
    "wide_ints",
    "raw_bytes",
    "long_enums",
];

fn mysql_config() -> ConnectionConfig {
    let var = |name: &str| env::var(format!("EXPORT_VERIFY_TEST_MYSQL_{name}")).ok();
    ConnectionConfig {
        driver: Driver::Mysql,
        host: var("HOST").unwrap_or_else(|| "127.0.0.1".into()),
        port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(3306),
        user: var("USER").unwrap_or_else(|| "root".into()),
        password: var("PASSWORD"),
        database: var("DATABASE").expect("EXPORT_VERIFY_TEST_MYSQL_DATABASE must be set"),
    }
}

/// Drops and recreates the fixture tables, then runs `statements`.
fn seed(config: &ConnectionConfig, statements: &[&str]) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    runtime.block_on(async {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database);
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        let mut conn = MySqlConnection::connect_with(&options)
            .await
            .expect("connect to mysql");
        sqlx::query("DROP VIEW IF EXISTS big_orders")
            .execute(&mut conn)
            .await
            .expect("drop view");
        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS `{table}`"))
                .execute(&mut conn)
                .await
                .expect("drop table");
        }
        for statement in statements {
            sqlx::query(statement)
                .execute(&mut conn)
                .await
                .unwrap_or_else(|e| panic!("executing {statement}: {e}"));
        }
        conn.close().await.expect("close mysql connection");
    });
}

fn fixture_filter(include_views: bool) -> TableFilter {
    TableFilter {
        include: TABLES.iter().map(|t| t.to_string()).collect(),
        exclude: Vec::new(),
        include_views,
    }
}

#[test]
#[ignore]
fn lists_tables_and_views_from_information_schema() {
    let config = mysql_config();
    let mut statements = ORDERS.to_vec();
    statements.push("CREATE VIEW big_orders AS SELECT id FROM orders WHERE total > 8");
    seed(&config, &statements);

    let tables = MysqlSource::connect(&config, false)
        .expect("connect")
        .list_tables()
        .unwrap();
    assert!(tables.contains(&"orders".to_string()));
    assert!(!tables.contains(&"big_orders".to_string()));

    let with_views = MysqlSource::connect(&config, true)
        .expect("connect")
        .list_tables()
        .unwrap();
    assert!(with_views.contains(&"big_orders".to_string()));
}

#[test]
#[ignore]
fn column_types_come_back_as_declared() {
    let config = mysql_config();
    seed(&config, ORDERS);
    let source = MysqlSource::connect(&config, false).expect("connect");

    let schema = source.table_schema("orders").unwrap();
    assert_eq!(schema.column_names(), vec!["id", "total", "created_at"]);
    assert_eq!(schema.columns[1].declared_type, "decimal(10,2)");
    let categories = schema
        .columns
        .iter()
        .map(|c| c.category())
        .collect::<Vec<_>>();
    assert_eq!(
        categories,
        vec![
            TypeCategory::Integer,
            TypeCategory::Float,
            TypeCategory::DateTime
        ]
    );
}

#[test]
#[ignore]
fn long_enum_definitions_are_read_in_full() {
    let config = mysql_config();
    let labels = (0..60)
        .map(|i| format!("'status_value_number_{i:03}'"))
        .collect::<Vec<_>>()
        .join(",");
    let create = format!("CREATE TABLE long_enums (state ENUM({labels}))");
    seed(&config, &[create.as_str()]);
    let source = MysqlSource::connect(&config, false).expect("connect");

    let schema = source.table_schema("long_enums").unwrap();
    let declared = &schema.columns[0].declared_type;
    assert_eq!(declared, &format!("enum({labels})"));
    assert!(declared.len() > 1024);
}

#[test]
#[ignore]
fn empty_table_still_reports_headers() {
    let config = mysql_config();
    seed(&config, &["CREATE TABLE empty_things (id INT, label VARCHAR(10))"]);
    let source = MysqlSource::connect(&config, false).expect("connect");

    let snapshot = source.fetch_table("empty_things").unwrap();
    assert_eq!(snapshot.headers, vec!["id", "label"]);
    assert_eq!(snapshot.row_count(), 0);
}

#[test]
#[ignore]
fn wide_values_decode_without_loss() {
    let config = mysql_config();
    seed(
        &config,
        &[
            "CREATE TABLE durations (t TIME)",
            "INSERT INTO durations VALUES ('36:00:00'), ('-01:30:00'), ('12:00:00')",
            "CREATE TABLE wide_ints (u BIGINT UNSIGNED, f FLOAT)",
            "INSERT INTO wide_ints VALUES (18446744073709551615, 1.1)",
            "CREATE TABLE raw_bytes (b VARBINARY(4))",
            "INSERT INTO raw_bytes VALUES (X'FF00')",
        ],
    );
    let source = MysqlSource::connect(&config, false).expect("connect");

    let times = source.fetch_table("durations").unwrap();
    let rendered = times
        .rows
        .iter()
        .map(|row| row[0].clone())
        .collect::<Vec<_>>();
    assert_eq!(
        rendered,
        vec![
            Some(Value::Text("36:00:00".into())),
            Some(Value::Text("-01:30:00".into())),
            Some(Value::Text("12:00:00".into())),
        ]
    );

    let ints = source.fetch_table("wide_ints").unwrap();
    assert_eq!(
        ints.rows[0],
        vec![
            Some(Value::Text("18446744073709551615".into())),
            Some(Value::Float(1.1)),
        ]
    );

    let bytes = source.fetch_table("raw_bytes").unwrap();
    assert_eq!(bytes.rows[0][0], Some(Value::Text("0xff00".into())));
}

#[test]
#[ignore]
fn full_run_matches_expected_export() {
    let config = mysql_config();
    seed(&config, ORDERS);
    let ws = TestWorkspace::new();
    let source = MysqlSource::connect(&config, false).expect("connect");
    let options = ExportOptions::new(ws.path().join("out"));

    let report = audit::run_audit(&source, &fixture_filter(false), &options).expect("run");
    assert_eq!(report.summary.mismatches, 0);
    assert_eq!(ws.read("out/orders.csv"), ORDERS_CSV);
}
