use super::decode_message;
use crate::error::StorageError;
use crate::store::{Row, StorageClient};
use greeting_schema::Message;
use serde_json::Value;
use tracing::info;

/// Inserts `{ text: default_text }` into `table` and returns the row the store persisted.
///
/// Every failure comes back as [`StorageError::Insert`] with the store's message.
pub async fn seed_default(
    store: &dyn StorageClient,
    table: &str,
    default_text: &str,
) -> Result<Message, StorageError> {
    let mut row = Row::new();
    row.insert("text".to_string(), Value::from(default_text));

    let persisted = store
        .insert(table, &row)
        .await
        .map_err(StorageError::into_insert)?;
    let message = decode_message(persisted).map_err(StorageError::into_insert)?;
    info!(table, id = message.id, "seeded default row");
    Ok(message)
}
