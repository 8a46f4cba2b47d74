pub mod config;
pub mod error;
pub mod greeting;
pub mod server;
pub mod store;

pub use error::{HandlerError, StorageError};
pub use greeting_schema::{ErrorBody, Message};
pub use store::StorageClient;
