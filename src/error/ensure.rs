use thiserror::Error as ThisError;

use super::StorageError;

/// Failure of the schema check itself.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EnsureError {
    /// The existence probe failed for a reason other than a missing relation.
    #[error("schema probe failed: {0}")]
    Probe(StorageError),
}
