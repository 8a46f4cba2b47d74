mod config;
mod ensure;
mod handler;
mod storage;

pub use config::ConfigError;
pub use ensure::EnsureError;
pub use handler::{HandlerError, TABLE_CREATION_FAILED};
pub use storage::{PG_UNDEFINED_TABLE, PGRST_TABLE_NOT_FOUND, StorageError};
