use super::{Dialect, Row, Select, StorageClient, check_identifier, quote_ident};
use crate::error::{ConfigError, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::QueryScalar;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool};
use std::{str::FromStr, time::Duration};
use tracing::info;

const NO_SUCH_TABLE: &str = "no such table: ";

type JsonScalar<'q> = QueryScalar<'q, Sqlite, String, SqliteArguments<'q>>;

/// SQLite-backed store.
///
/// Rows cross the boundary as JSON objects built by SQLite itself (`json_object`), so
/// no per-column type mapping is needed on this side.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, ConfigError> {
        let database_error = |source| ConfigError::Database {
            url: database_url.to_string(),
            source,
        };
        let connect_opts = SqliteConnectOptions::from_str(database_url)
            .map_err(database_error)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(database_error)?;

        info!(database_url, "SQLite store initialized");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StorageClient for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn exec_sql(&self, sql: &str) -> Result<(), StorageError> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(classify_error)?;
        Ok(())
    }

    async fn select(&self, query: Select<'_>) -> Result<Vec<Row>, StorageError> {
        let table = check_identifier(query.table)?;
        let projection = json_projection(query.columns.iter().copied())?;
        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(table));
        if let Some(column) = query.order_by {
            let column = check_identifier(column)?;
            sql.push_str(&format!(" ORDER BY {} ASC", quote_ident(column)));
        }
        sql.push_str(" LIMIT ?");

        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(classify_error)?;

        rows.iter().map(|json| parse_row(json)).collect()
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Row, StorageError> {
        let table = check_identifier(table)?;

        // Autocommit statements only: a deferred transaction that reads first cannot
        // wait out a concurrent writer under WAL.
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                .bind(table)
                .fetch_all(&self.pool)
                .await
                .map_err(classify_error)?;
        if columns.is_empty() {
            return Err(StorageError::RelationMissing {
                relation: table.to_string(),
                message: format!("{NO_SUCH_TABLE}{table}"),
            });
        }
        let projection = json_projection(columns.iter().map(String::as_str))?;

        let targets = row
            .keys()
            .map(|k| check_identifier(k).map(quote_ident))
            .collect::<Result<Vec<_>, _>>()?;
        let sql = if targets.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {projection}",
                quote_ident(table)
            )
        } else {
            let placeholders = vec!["?"; targets.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING {projection}",
                quote_ident(table),
                targets.join(", ")
            )
        };

        let query = row
            .values()
            .fold(sqlx::query_scalar::<_, String>(&sql), bind_value);
        let inserted = query
            .fetch_one(&self.pool)
            .await
            .map_err(classify_error)?;

        parse_row(&inserted)
    }
}

/// Builds a `json_object(...)` projection over validated column names.
fn json_projection<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<String, StorageError> {
    let pairs = columns
        .into_iter()
        .map(|c| check_identifier(c).map(|c| format!("'{c}', {}", quote_ident(c))))
        .collect::<Result<Vec<_>, _>>()?;
    if pairs.is_empty() {
        return Err(StorageError::failure(None, "empty column list"));
    }
    Ok(format!("json_object({})", pairs.join(", ")))
}

fn bind_value<'q>(query: JsonScalar<'q>, value: &'q Value) -> JsonScalar<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

fn parse_row(json: &str) -> Result<Row, StorageError> {
    serde_json::from_str(json)
        .map_err(|e| StorageError::failure(None, format!("malformed row: {e}")))
}

fn classify_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) => {
            let message = db.message().to_string();
            match message.strip_prefix(NO_SUCH_TABLE) {
                Some(relation) => StorageError::RelationMissing {
                    relation: relation.to_string(),
                    message: message.clone(),
                },
                None => StorageError::failure(db.code().as_deref(), message.clone()),
            }
        }
        other => StorageError::failure(None, other.to_string()),
    }
}
