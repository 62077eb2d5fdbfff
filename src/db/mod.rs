//! Data access: one `Repository` seam with a live Postgres backend and a
//! fixed demo dataset behind it.
//!
//! Every primitive is infallible from the caller's point of view. Failures
//! are logged here and degrade to an empty / falsy value so the page layer
//! always has something to render.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;

pub mod fixture;
pub mod live;

/// A result row keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    OptionalText(Option<String>),
    OptionalInt(Option<i64>),
    Timestamp(OffsetDateTime),
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v.into())
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<Option<String>> for Param {
    fn from(v: Option<String>) -> Self {
        Param::OptionalText(v)
    }
}

impl From<Option<i64>> for Param {
    fn from(v: Option<i64>) -> Self {
        Param::OptionalInt(v)
    }
}

impl From<OffsetDateTime> for Param {
    fn from(v: OffsetDateTime) -> Self {
        Param::Timestamp(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Live,
    Demo,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("database unavailable: {0}")]
    ConnectionUnavailable(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("insert returned no id column")]
    MissingGeneratedId,
}

/// Outcome of the startup connection attempt.
pub enum Connection {
    Live(PgPool),
    Unavailable,
}

/// Build a pool and prove it works with one acquire. Never fails: any
/// problem is logged and reported as `Unavailable`.
pub async fn connect(config: &DatabaseConfig) -> Connection {
    if config.demo_mode {
        info!("DEMO_MODE set; not connecting to the database");
        return Connection::Unavailable;
    }

    let result = PgPoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
        .connect(&config.connection_url())
        .await
        .map_err(DataError::ConnectionUnavailable);

    match result {
        Ok(pool) => {
            info!(host = %config.host, db = %config.name, "database connection established");
            Connection::Live(pool)
        }
        Err(e) => {
            warn!(error = %e, "database unreachable; falling back to demo data");
            Connection::Unavailable
        }
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    fn mode(&self) -> DataMode;

    async fn fetch_all(&self, query: &str, params: &[Param]) -> Vec<Row>;

    async fn fetch_one(&self, query: &str, params: &[Param]) -> Option<Row>;

    /// Returns the generated id of the new row.
    async fn insert(&self, query: &str, params: &[Param]) -> Option<i64>;

    /// Returns the number of affected rows.
    async fn update(&self, query: &str, params: &[Param]) -> u64;

    async fn delete(&self, query: &str, params: &[Param]) -> u64 {
        self.update(query, params).await
    }

    async fn record_exists(&self, query: &str, params: &[Param]) -> bool;

    async fn table_exists(&self, table: &str) -> bool {
        self.record_exists(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
            &[Param::from(table)],
        )
        .await
    }
}

/// Render fixed status names as an SQL `IN` list body: `'a', 'b'`.
pub fn quoted_list(values: &[&'static str]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decode a row into a typed entity. Rows that do not fit are logged and dropped.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Option<T> {
    match serde_json::from_value(Value::Object(row)) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(error = %e, entity = std::any::type_name::<T>(), "row decode failed");
            None
        }
    }
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Vec<T> {
    rows.into_iter().filter_map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        id: i64,
        name: String,
    }

    fn row(v: Value) -> Row {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn params_convert_from_native_types() {
        assert_eq!(Param::from(7_i32), Param::Int(7));
        assert_eq!(Param::from("a"), Param::Text("a".into()));
        assert_eq!(Param::from(None::<String>), Param::OptionalText(None));
        assert_eq!(Param::from(true), Param::Bool(true));
        assert_eq!(Param::from(Some(5_i64)), Param::OptionalInt(Some(5)));
    }

    #[test]
    fn quoted_list_wraps_each_name() {
        assert_eq!(quoted_list(&["new", "responded"]), "'new', 'responded'");
        assert_eq!(quoted_list(&[]), "");
    }

    #[test]
    fn from_rows_skips_rows_that_do_not_decode() {
        let rows = vec![
            row(json!({"id": 1, "name": "ok"})),
            row(json!({"id": "x"})),
            row(json!({"id": 2, "name": "also ok", "extra": true})),
        ];
        let pairs: Vec<Pair> = from_rows(rows);
        assert_eq!(
            pairs,
            vec![
                Pair { id: 1, name: "ok".into() },
                Pair { id: 2, name: "also ok".into() }
            ]
        );
    }

    #[tokio::test]
    async fn demo_mode_never_connects() {
        let cfg = crate::config::AppConfig::from_lookup(|k| {
            (k == "DEMO_MODE").then(|| "true".to_string())
        })
        .unwrap();
        assert!(matches!(connect(&cfg.database).await, Connection::Unavailable));
    }

    #[tokio::test]
    async fn unreachable_database_reports_unavailable() {
        let cfg = crate::config::AppConfig::from_lookup(|k| match k {
            "DB_HOST" => Some("127.0.0.1".into()),
            "DB_PORT" => Some("1".into()),
            "DB_CONNECT_TIMEOUT_SECS" => Some("1".into()),
            _ => None,
        })
        .unwrap();
        assert!(!cfg.database.demo_mode);
        assert!(matches!(connect(&cfg.database).await, Connection::Unavailable));
    }
}
