use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("invalid table name {0:?}: expected a plain SQL identifier")]
    InvalidTableName(String),

    #[error("invalid store url {url}: {source}")]
    InvalidStoreUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("store.url must be set (env: SUPABASE_URL) for the rest backend")]
    MissingStoreUrl,

    #[error("store.key must be set and non-empty (env: SUPABASE_ANON_KEY) for the rest backend")]
    MissingStoreKey,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to open database {url}: {source}")]
    Database {
        url: String,
        #[source]
        source: sqlx::Error,
    },
}
