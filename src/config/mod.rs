mod basic;
mod greeting;
mod store;

pub use basic::BasicConfig;
pub use greeting::GreetingConfig;
pub use store::{StoreBackend, StoreConfig, redact};

use crate::error::ConfigError;
use crate::store::is_valid_identifier;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Store backend and credentials (see `store` table in config.toml).
    #[serde(default)]
    pub store: StoreConfig,

    /// Handler settings (see `greeting` table in config.toml).
    #[serde(default)]
    pub greeting: GreetingConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "GREETING_";
const ENV_STORE_URL: &str = "SUPABASE_URL";
const ENV_STORE_KEY: &str = "SUPABASE_ANON_KEY";

impl Config {
    /// Builds a Figment that merges defaults, an optional config TOML file and the environment.
    ///
    /// Precedence (last wins): defaults, `config.toml`, `GREETING_*` variables
    /// (`__` separates tables), then `SUPABASE_URL` / `SUPABASE_ANON_KEY`.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&[ENV_STORE_URL, ENV_STORE_KEY])
                    .map(|key| {
                        if key == ENV_STORE_URL {
                            "store.url".into()
                        } else {
                            "store.key".into()
                        }
                    }),
            )
    }

    /// Extracts and validates configuration from an arbitrary figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let cfg: Self = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads configuration from defaults, `config.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// The table name is interpolated into DDL, so it must be a plain identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_identifier(&self.greeting.table) {
            return Err(ConfigError::InvalidTableName(self.greeting.table.clone()));
        }
        Ok(())
    }
}
