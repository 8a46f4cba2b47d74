use super::{Row, Select, StorageClient, check_identifier};
use crate::config::StoreConfig;
use crate::error::{ConfigError, PG_UNDEFINED_TABLE, PGRST_TABLE_NOT_FOUND, StorageError};
use async_trait::async_trait;
use greeting_schema::PostgrestErrorBody;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REST_PATH: &str = "rest/v1/";

/// PostgREST client (the HTTP face of Supabase).
///
/// Every request authenticates with the same access key, both as `apikey` and as a
/// bearer token.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base: Url,
    key: String,
    rpc_name: String,
}

impl RestStore {
    pub fn new(
        client: reqwest::Client,
        url: &Url,
        key: impl Into<String>,
        rpc_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let mut root = url.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base = root
            .join(REST_PATH)
            .map_err(|source| ConfigError::InvalidStoreUrl {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base,
            key: key.into(),
            rpc_name: rpc_name.into(),
        })
    }

    pub fn from_config(cfg: &StoreConfig) -> Result<Self, ConfigError> {
        let url = cfg.url.as_ref().ok_or(ConfigError::MissingStoreUrl)?;
        if cfg.key.trim().is_empty() {
            return Err(ConfigError::MissingStoreKey);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Self::new(client, url, cfg.key.clone(), cfg.rpc_name.clone())
    }

    /// Root of the REST API, e.g. `https://<project>.supabase.co/rest/v1/`.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageError> {
        self.base
            .join(path)
            .map_err(|e| StorageError::failure(None, format!("invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

#[async_trait]
impl StorageClient for RestStore {
    async fn exec_sql(&self, sql: &str) -> Result<(), StorageError> {
        let url = self.endpoint(&format!("rpc/{}", self.rpc_name))?;
        let resp = self
            .request(Method::POST, url)
            .json(&json!({ "sql": sql }))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(resp, &self.rpc_name).await?;
        Ok(())
    }

    async fn select(&self, query: Select<'_>) -> Result<Vec<Row>, StorageError> {
        let table = check_identifier(query.table)?;
        let mut url = self.endpoint(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &query.columns.join(","));
            if let Some(column) = query.order_by {
                pairs.append_pair("order", &format!("{column}.asc"));
            }
            pairs.append_pair("limit", &query.limit.to_string());
        }
        debug!(url = %url, "PostgREST select");

        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport_error)?;
        let resp = ensure_success(resp, table).await?;
        resp.json::<Vec<Row>>().await.map_err(decode_error)
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<Row, StorageError> {
        let table = check_identifier(table)?;
        let url = self.endpoint(table)?;
        let resp = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(transport_error)?;
        let resp = ensure_success(resp, table).await?;
        resp.json::<Vec<Row>>()
            .await
            .map_err(decode_error)?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::failure(None, "insert returned no rows"))
    }
}

async fn ensure_success(resp: Response, relation: &str) -> Result<Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.map_err(transport_error)?;
    Err(classify_error(status, &body, relation))
}

/// Maps a non-2xx PostgREST response onto the closed [`StorageError`] set.
pub(crate) fn classify_error(status: StatusCode, body: &str, relation: &str) -> StorageError {
    let Ok(parsed) = serde_json::from_str::<PostgrestErrorBody>(body) else {
        return StorageError::failure(None, format!("{status}: {body}"));
    };
    let message = if parsed.message.is_empty() {
        format!("{status}: {body}")
    } else {
        parsed.message.clone()
    };
    match parsed.code() {
        Some(PG_UNDEFINED_TABLE | PGRST_TABLE_NOT_FOUND) => StorageError::RelationMissing {
            relation: relation.to_string(),
            message,
        },
        code => StorageError::failure(code, message),
    }
}

fn transport_error(e: reqwest::Error) -> StorageError {
    StorageError::failure(None, format!("store request failed: {e}"))
}

fn decode_error(e: reqwest::Error) -> StorageError {
    StorageError::failure(None, format!("malformed store response: {e}"))
}
