//! Error types for the stores.

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON payload could not be serialised or deserialised.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of row that was looked up (`event`, `notification`).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },
}
