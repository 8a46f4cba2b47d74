pub mod error_body;
pub mod message;
pub mod postgrest;

pub use error_body::ErrorBody;
pub use message::Message;
pub use postgrest::PostgrestErrorBody;
