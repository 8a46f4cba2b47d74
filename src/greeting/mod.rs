//! Lazy-initialisation core: make sure the relation exists, read one row, seed a
//! default row when the relation is empty.
//!
//! Layout:
//! - `schema.rs`: existence probe and on-demand creation
//! - `seed.rs`: default-row insert
//! - `orchestrator.rs`: one invocation, end to end

pub mod orchestrator;
pub mod schema;
pub mod seed;

pub use orchestrator::handle;
pub use schema::{SchemaOutcome, ensure};
pub use seed::seed_default;

use crate::error::StorageError;
use crate::store::Row;
use greeting_schema::Message;
use serde_json::Value;

pub(crate) fn decode_message(row: Row) -> Result<Message, StorageError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| StorageError::failure(None, format!("malformed row: {e}")))
}
