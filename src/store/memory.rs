use super::{Row, Select, StorageClient};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const UNDEFINED_COLUMN: &str = "42703";
const DUPLICATE_TABLE: &str = "42P07";
const SYNTAX_ERROR: &str = "42601";
const SEQUENCE_LIMIT_EXCEEDED: &str = "2200H";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    name: String,
    generated: bool,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

#[derive(Debug, Default)]
struct Faults {
    ignore_exec_sql: bool,
    deny_selects: Option<StorageError>,
    exec_sql: VecDeque<StorageError>,
    select: VecDeque<StorageError>,
    insert: VecDeque<StorageError>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Table>,
    faults: Faults,
}

/// Process-local store with Postgres-flavoured behaviour and error codes.
///
/// Each call yields to the scheduler once before touching state, so concurrent
/// callers interleave the way they would against a remote store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    exec_sql_calls: AtomicUsize,
    select_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-creates `table` as `(id serial primary key, text text)`.
    #[must_use]
    pub fn with_messages_table(self, table: &str) -> Self {
        self.lock().tables.insert(
            table.to_ascii_lowercase(),
            Table::new(vec![
                Column {
                    name: "id".to_string(),
                    generated: true,
                },
                Column {
                    name: "text".to_string(),
                    generated: false,
                },
            ]),
        );
        self
    }

    /// Accepts `exec_sql` calls and reports success without running them.
    #[must_use]
    pub fn ignore_exec_sql(self) -> Self {
        self.lock().faults.ignore_exec_sql = true;
        self
    }

    /// Fails every select with `err`.
    pub fn deny_selects(&self, err: StorageError) {
        self.lock().faults.deny_selects = Some(err);
    }

    pub fn fail_next_exec_sql(&self, err: StorageError) {
        self.lock().faults.exec_sql.push_back(err);
    }

    pub fn fail_next_select(&self, err: StorageError) {
        self.lock().faults.select.push_back(err);
    }

    pub fn fail_next_insert(&self, err: StorageError) {
        self.lock().faults.insert.push_back(err);
    }

    pub fn exec_sql_calls(&self) -> usize {
        self.exec_sql_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock()
            .tables
            .contains_key(&table.to_ascii_lowercase())
    }

    /// Snapshot of every row in insertion order; empty if the table is missing.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock()
            .tables
            .get(&table.to_ascii_lowercase())
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageClient for MemoryStore {
    async fn exec_sql(&self, sql: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.exec_sql_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut inner = self.lock();
        if let Some(err) = inner.faults.exec_sql.pop_front() {
            return Err(err);
        }
        if inner.faults.ignore_exec_sql {
            return Ok(());
        }

        let create = parse_create_table(sql)?;
        if inner.tables.contains_key(&create.name) {
            if create.if_not_exists {
                return Ok(());
            }
            return Err(StorageError::failure(
                Some(DUPLICATE_TABLE),
                format!("relation \"{}\" already exists", create.name),
            ));
        }
        inner
            .tables
            .insert(create.name, Table::new(create.columns));
        Ok(())
    }

    async fn select(&self, query: Select<'_>) -> Result<Vec<Row>, StorageError> {
        tokio::task::yield_now().await;
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut inner = self.lock();
        if let Some(err) = inner.faults.deny_selects.clone() {
            return Err(err);
        }
        if let Some(err) = inner.faults.select.pop_front() {
            return Err(err);
        }

        let name = query.table.to_ascii_lowercase();
        let table = inner
            .tables
            .get(&name)
            .ok_or_else(|| StorageError::relation_missing(&name))?;

        for column in query.columns.iter().chain(query.order_by.iter()) {
            if !table.has_column(column) {
                return Err(StorageError::failure(
                    Some(UNDEFINED_COLUMN),
                    format!("column {name}.{column} does not exist"),
                ));
            }
        }

        let mut rows: Vec<&Row> = table.rows.iter().collect();
        if let Some(column) = query.order_by {
            rows.sort_by(|a, b| compare_values(a.get(column), b.get(column)));
        }

        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|row| {
                query
                    .columns
                    .iter()
                    .map(|c| {
                        let value = row.get(*c).cloned().unwrap_or(Value::Null);
                        ((*c).to_string(), value)
                    })
                    .collect()
            })
            .collect())
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Row, StorageError> {
        tokio::task::yield_now().await;
        self.insert_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut inner = self.lock();
        if let Some(err) = inner.faults.insert.pop_front() {
            return Err(err);
        }

        let name = table.to_ascii_lowercase();
        let table = inner
            .tables
            .get_mut(&name)
            .ok_or_else(|| StorageError::relation_missing(&name))?;

        if let Some(unknown) = row.keys().find(|k| !table.has_column(k)) {
            return Err(StorageError::failure(
                Some(UNDEFINED_COLUMN),
                format!("column \"{unknown}\" of relation \"{name}\" does not exist"),
            ));
        }

        let mut persisted = Row::new();
        for column in &table.columns {
            let value = match row.get(&column.name) {
                Some(v) => v.clone(),
                None if column.generated => {
                    let id = table.next_id;
                    table.next_id = id.checked_add(1).ok_or_else(|| {
                        StorageError::failure(
                            Some(SEQUENCE_LIMIT_EXCEEDED),
                            format!("nextval: reached maximum value of sequence \"{name}_id_seq\""),
                        )
                    })?;
                    Value::from(id)
                }
                None => Value::Null,
            };
            if column.generated {
                if let Some(id) = value.as_i64() {
                    table.next_id = table.next_id.max(id.saturating_add(1));
                }
            }
            persisted.insert(column.name.clone(), value);
        }
        table.rows.push(persisted.clone());
        Ok(persisted)
    }
}

#[derive(Debug, PartialEq)]
struct CreateTable {
    name: String,
    if_not_exists: bool,
    columns: Vec<Column>,
}

/// Understands `create table [if not exists] <name> (<column> <type> [constraints], ...)`.
fn parse_create_table(sql: &str) -> Result<CreateTable, StorageError> {
    let sql = sql.trim().trim_end_matches(';').trim();
    let syntax_error = || {
        let near = sql.split_whitespace().next().unwrap_or("");
        StorageError::failure(
            Some(SYNTAX_ERROR),
            format!("syntax error at or near \"{near}\""),
        )
    };

    let (open, close) = match (sql.find('('), sql.rfind(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(syntax_error()),
    };

    let head: Vec<String> = sql[..open]
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();
    let (name, if_not_exists) = match head.as_slice() {
        [create, table, name] if create == "create" && table == "table" => (name, false),
        [create, table, if_, not, exists, name]
            if create == "create"
                && table == "table"
                && if_ == "if"
                && not == "not"
                && exists == "exists" =>
        {
            (name, true)
        }
        _ => return Err(syntax_error()),
    };

    let columns = sql[open + 1..close]
        .split(',')
        .map(|def| {
            let parts: Vec<String> = def
                .split_whitespace()
                .map(str::to_ascii_lowercase)
                .collect();
            let [name, ty, constraints @ ..] = parts.as_slice() else {
                return Err(syntax_error());
            };
            let primary_key = constraints.join(" ").contains("primary key");
            let generated = matches!(ty.as_str(), "serial" | "bigserial" | "smallserial")
                || (ty.starts_with("int") && primary_key);
            Ok(Column {
                name: name.trim_matches(['"', '`']).to_string(),
                generated,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CreateTable {
        name: name.trim_matches(['"', '`']).to_string(),
        if_not_exists,
        columns,
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        // Postgres sorts nulls last in ascending order.
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
