use thiserror::Error;

/// Errors raised by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Could not check a connection out of the pool.
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The backing table could not be read or written.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An item could not be encoded, or a popped item was not a valid event.
    /// A malformed item is consumed by the failing pop.
    #[error("invalid queue item: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking database task panicked or was cancelled.
    #[error("queue task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
