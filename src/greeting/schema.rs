use crate::error::{EnsureError, StorageError};
use crate::store::{Select, StorageClient};
use tracing::{debug, info, warn};

/// Columns read by the existence probe.
const PROBE_COLUMNS: &[&str] = &["text"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// The probe read succeeded.
    Present,
    /// The relation was missing and the creation statement was accepted.
    Created,
    /// The relation was missing and the store rejected the creation statement.
    /// The relation may still exist by the time it is read.
    CreationRejected(StorageError),
}

/// Makes sure `table` exists, creating it when the probe reports it missing.
///
/// Only a missing relation triggers creation; any other probe failure is returned as
/// [`EnsureError::Probe`] unchanged. A rejected creation statement is still a success,
/// reported as [`SchemaOutcome::CreationRejected`]. The creation statement is idempotent,
/// so callers racing on a fresh store may all run it.
pub async fn ensure(store: &dyn StorageClient, table: &str) -> Result<SchemaOutcome, EnsureError> {
    match store.select(Select::new(table, PROBE_COLUMNS).limit(1)).await {
        Ok(_) => {
            debug!(table, "relation present");
            Ok(SchemaOutcome::Present)
        }
        Err(err) if err.is_relation_missing() => {
            info!(table, error = %err, "relation missing, creating it");
            let ddl = store.dialect().create_table_sql(table);
            match store.exec_sql(&ddl).await {
                Ok(()) => Ok(SchemaOutcome::Created),
                Err(err) => {
                    warn!(table, error = %err, "creation statement rejected");
                    Ok(SchemaOutcome::CreationRejected(err))
                }
            }
        }
        Err(err) => Err(EnsureError::Probe(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn present_table_is_left_alone() {
        let store = MemoryStore::new().with_messages_table("messages");
        assert_eq!(
            ensure(&store, "messages").await,
            Ok(SchemaOutcome::Present)
        );
        assert_eq!(store.exec_sql_calls(), 0);
    }

    #[tokio::test]
    async fn missing_table_is_created() {
        let store = MemoryStore::new();
        assert_eq!(
            ensure(&store, "messages").await,
            Ok(SchemaOutcome::Created)
        );
        assert!(store.has_table("messages"));
        assert_eq!(
            ensure(&store, "messages").await,
            Ok(SchemaOutcome::Present)
        );
        assert_eq!(store.exec_sql_calls(), 1);
    }

    #[tokio::test]
    async fn other_probe_failures_pass_through() {
        let store = MemoryStore::new();
        let denied = StorageError::failure(Some("42501"), "permission denied for table messages");
        store.fail_next_select(denied.clone());
        assert_eq!(
            ensure(&store, "messages").await,
            Err(EnsureError::Probe(denied))
        );
        assert_eq!(store.exec_sql_calls(), 0);
    }

    #[tokio::test]
    async fn rejected_creation_is_still_success() {
        let store = MemoryStore::new();
        let rejected = StorageError::failure(
            Some("PGRST202"),
            "Could not find the function public.exec_sql(sql) in the schema cache",
        );
        store.fail_next_exec_sql(rejected.clone());
        assert_eq!(
            ensure(&store, "messages").await,
            Ok(SchemaOutcome::CreationRejected(rejected))
        );
        assert_eq!(store.exec_sql_calls(), 1);
    }
}
