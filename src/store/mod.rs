//! Store boundary: the capability the greeting core runs against.
//!
//! Backends:
//! - `rest`: PostgREST (Supabase) over HTTP
//! - `sqlite`: local SQLite file via sqlx
//! - `memory`: process-local tables, with fault injection for tests

pub mod memory;
pub mod rest;
pub mod sqlite;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{ConfigError, StorageError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One row as returned by a store: column name to JSON value.
pub type Row = Map<String, Value>;

/// Maximum identifier length accepted (PostgreSQL's NAMEDATALEN - 1).
const MAX_IDENTIFIER_LEN: usize = 63;

/// A filtered, projected read of one relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Select<'a> {
    pub table: &'a str,
    pub columns: &'a [&'a str],
    /// Ascending sort column.
    pub order_by: Option<&'a str>,
    pub limit: u32,
}

impl<'a> Select<'a> {
    pub fn new(table: &'a str, columns: &'a [&'a str]) -> Self {
        Self {
            table,
            columns,
            order_by: None,
            limit: 1,
        }
    }

    #[must_use]
    pub fn order_by(mut self, column: &'a str) -> Self {
        self.order_by = Some(column);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// DDL flavour understood by a store's `exec_sql`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Idempotent creation statement for the messages relation.
    pub fn create_table_sql(self, table: &str) -> String {
        match self {
            Dialect::Postgres => {
                format!("create table if not exists {table} (id serial primary key, text text)")
            }
            Dialect::Sqlite => format!(
                "create table if not exists {} (id integer primary key autoincrement, text text)",
                quote_ident(table)
            ),
        }
    }
}

/// Capability handle to a relational store.
///
/// Implementations classify every raw failure into [`StorageError`]; callers never
/// see store-specific codes.
#[async_trait]
pub trait StorageClient: Send + Sync {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    /// Runs one migration statement.
    async fn exec_sql(&self, sql: &str) -> Result<(), StorageError>;

    async fn select(&self, query: Select<'_>) -> Result<Vec<Row>, StorageError>;

    /// Inserts `row` and returns the row as persisted, including generated keys.
    async fn insert(&self, table: &str, row: &Row) -> Result<Row, StorageError>;
}

/// Builds the configured backend once; the handle is shared by every request.
pub async fn connect(cfg: &StoreConfig) -> Result<Arc<dyn StorageClient>, ConfigError> {
    let store: Arc<dyn StorageClient> = match cfg.backend {
        StoreBackend::Rest => Arc::new(RestStore::from_config(cfg)?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::connect(&cfg.database_url).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Backtick quoting: unlike `"..."`, SQLite never reinterprets it as a string literal.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub(crate) fn check_identifier(name: &str) -> Result<&str, StorageError> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(StorageError::failure(
            None,
            format!("invalid identifier {name:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rules() {
        assert!(is_valid_identifier("messages"));
        assert!(is_valid_identifier("_t1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1messages"));
        assert!(!is_valid_identifier("public.messages"));
        assert!(!is_valid_identifier("x\"; drop"));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn postgres_ddl_matches_persisted_schema() {
        assert_eq!(
            Dialect::Postgres.create_table_sql("messages"),
            "create table if not exists messages (id serial primary key, text text)"
        );
    }

    #[test]
    fn sqlite_ddl_uses_rowid_alias() {
        assert_eq!(
            Dialect::Sqlite.create_table_sql("messages"),
            "create table if not exists `messages` (id integer primary key autoincrement, text text)"
        );
    }

    #[test]
    fn select_builder_defaults_to_one_row() {
        let q = Select::new("messages", &["text"]);
        assert_eq!(q.limit, 1);
        assert_eq!(q.order_by, None);
        let q = q.order_by("id").limit(5);
        assert_eq!(q.order_by, Some("id"));
        assert_eq!(q.limit, 5);
    }
}
