use super::schema::{self, SchemaOutcome};
use super::{decode_message, seed};
use crate::config::GreetingConfig;
use crate::error::{EnsureError, HandlerError, StorageError};
use crate::store::{Select, StorageClient};
use greeting_schema::Message;
use tracing::{debug, error, info, warn};

/// Columns returned to callers.
const READ_COLUMNS: &[&str] = &["id", "text"];

/// Runs one invocation: ensure the relation, read its first row, seed a default row
/// if it is empty.
///
/// Steps run strictly in sequence and nothing is retried; every store failure is
/// terminal for this invocation.
///
/// The empty-read-then-seed sequence is not atomic. Concurrent invocations that all
/// observe an empty relation will each insert a default row, so a fresh relation may
/// end up with several default rows.
pub async fn handle(
    store: &dyn StorageClient,
    cfg: &GreetingConfig,
) -> Result<Message, HandlerError> {
    let table = cfg.table.as_str();

    match schema::ensure(store, table).await {
        Ok(SchemaOutcome::CreationRejected(err)) if cfg.verify_creation => {
            error!(table, error = %err, "table creation rejected");
            return Err(HandlerError::SchemaUnavailable);
        }
        Ok(outcome) => debug!(table, ?outcome, "schema check done"),
        Err(EnsureError::Probe(err)) => {
            warn!(table, error = %err, "schema check degraded, continuing to read");
        }
    }

    let rows = store
        .select(
            Select::new(table, READ_COLUMNS)
                .order_by("id")
                .limit(1),
        )
        .await
        .map_err(|err| read_error(table, err))?;

    match rows.into_iter().next() {
        Some(row) => {
            let message = decode_message(row).map_err(storage_failure)?;
            debug!(table, id = message.id, "returning first row");
            Ok(message)
        }
        None => {
            info!(table, "relation empty, seeding default row");
            seed::seed_default(store, table, &cfg.default_text)
                .await
                .map_err(storage_failure)
        }
    }
}

fn read_error(table: &str, err: StorageError) -> HandlerError {
    if err.is_relation_missing() {
        error!(table, error = %err, "relation still missing after schema check");
        HandlerError::SchemaUnavailable
    } else {
        storage_failure(err)
    }
}

fn storage_failure(err: StorageError) -> HandlerError {
    HandlerError::StorageFailure(err.message().to_string())
}
