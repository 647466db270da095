//! Durable event queue for Herald.
//!
//! Ingestion pushes stored events here; the dispatch worker is the single
//! consumer. Items are popped in FIFO order and are gone once popped: there
//! is no acknowledgement or visibility timeout, so an event whose processing
//! fails stays unprocessed in the event store until something re-pushes it.
//!
//! Two backends implement [`EventQueue`]:
//!
//! - [`SqliteQueue`], a table in the main database (the default).
//! - `RedisQueue`, a Redis list driven with `LPUSH` / `BRPOP`, behind the
//!   `redis` cargo feature.

mod error;
#[cfg(feature = "redis")]
mod redis_queue;
mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use herald_types::Event;

pub use error::QueueError;
#[cfg(feature = "redis")]
pub use redis_queue::RedisQueue;
pub use sqlite::SqliteQueue;

/// Default list / queue name shared by producers and the worker.
pub const DEFAULT_QUEUE_NAME: &str = "notification_queue";

/// A FIFO channel of events between ingestion and the dispatch worker.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// The queue name (SQLite) or list key (Redis) items are stored under.
    fn name(&self) -> &str;

    /// Appends `event` to the tail of the queue.
    async fn push(&self, event: &Event) -> Result<(), QueueError>;

    /// Removes and returns the head of the queue, waiting up to `timeout`
    /// for one to arrive.
    ///
    /// Returns `Ok(None)` when the timeout elapses on an empty queue.
    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<Event>, QueueError>;
}
