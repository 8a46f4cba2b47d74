use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// PostgREST error response schema.
///
/// `code` is either a PostgreSQL SQLSTATE (e.g. `42P01`) or a PostgREST-specific
/// `PGRSTxxx` code.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct PostgrestErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default)]
    pub message: String,

    /// Often a string or null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<Value>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl PostgrestErrorBody {
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}
