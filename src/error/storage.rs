use thiserror::Error as ThisError;

/// SQLSTATE for `undefined_table`.
pub const PG_UNDEFINED_TABLE: &str = "42P01";
/// PostgREST code for a relation absent from its schema cache.
pub const PGRST_TABLE_NOT_FOUND: &str = "PGRST205";

/// Closed set of failures a [`StorageClient`](crate::store::StorageClient) may report.
///
/// Backends classify their raw errors into this set once; nothing above the store
/// boundary inspects store-specific codes. `Display` is the store's own message so it
/// can be surfaced to callers unmodified.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum StorageError {
    /// The target relation does not exist.
    #[error("{message}")]
    RelationMissing { relation: String, message: String },

    /// A row insert was rejected.
    #[error("{message}")]
    Insert { message: String },

    /// Any other store-level failure.
    #[error("{message}")]
    Failure {
        code: Option<String>,
        message: String,
    },
}

impl StorageError {
    /// Missing relation with the Postgres-style message.
    pub fn relation_missing(relation: impl Into<String>) -> Self {
        let relation = relation.into();
        let message = format!("relation \"{relation}\" does not exist");
        StorageError::RelationMissing { relation, message }
    }

    pub fn failure(code: Option<&str>, message: impl Into<String>) -> Self {
        StorageError::Failure {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_relation_missing(&self) -> bool {
        matches!(self, StorageError::RelationMissing { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            StorageError::RelationMissing { message, .. }
            | StorageError::Insert { message }
            | StorageError::Failure { message, .. } => message,
        }
    }

    /// Re-tag any failure as a rejected insert, keeping the store's message.
    pub fn into_insert(self) -> Self {
        match self {
            StorageError::Insert { .. } => self,
            other => StorageError::Insert {
                message: other.message().to_string(),
            },
        }
    }
}
