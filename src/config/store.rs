use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

/// Which [`StorageClient`](crate::store::StorageClient) implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgREST (Supabase) over HTTP.
    #[default]
    Rest,
    /// Local SQLite file via sqlx.
    Sqlite,
    /// Process-local tables; data is lost on exit.
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreBackend::Rest => "rest",
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Store connection settings.
#[derive(Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// TOML: `store.backend`. Default: `rest`.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Store endpoint for the `rest` backend.
    /// TOML: `store.url`. Env: `SUPABASE_URL`.
    #[serde(default)]
    pub url: Option<Url>,

    /// Access key sent as `apikey` and bearer token.
    /// TOML: `store.key`. Env: `SUPABASE_ANON_KEY`.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub key: String,

    /// Name of the store-side function that runs arbitrary SQL.
    /// TOML: `store.rpc_name`. Default: `exec_sql`.
    #[serde(default = "default_rpc_name")]
    pub rpc_name: String,

    /// Database URL for the `sqlite` backend.
    /// TOML: `store.database_url`. Default: `sqlite://data.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            key: String::new(),
            rpc_name: default_rpc_name(),
            database_url: default_database_url(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("key", &redact(&self.key))
            .field("rpc_name", &self.rpc_name)
            .field("database_url", &self.database_url)
            .finish()
    }
}

/// Masks a secret for logs, keeping only whether it is set.
pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for store.key",
        )),
    }
}

fn default_rpc_name() -> String {
    "exec_sql".to_string()
}

fn default_database_url() -> String {
    "sqlite://data.db".to_string()
}
