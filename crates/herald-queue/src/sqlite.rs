//! Queue backed by the `event_queue` table.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use herald_db::DbPool;
use herald_types::Event;
use rusqlite::OptionalExtension;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::{EventQueue, QueueError};

/// Upper bound between re-checks of the table while a pop is waiting, so
/// rows written by other processes are picked up without a wakeup.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// SQLite-backed FIFO queue.
///
/// Rows are ordered by their autoincrement sequence and removed with a single
/// `DELETE ... RETURNING`, so concurrent consumers never receive the same
/// item. Pushes through any clone of the same queue wake a waiting pop
/// immediately.
#[derive(Clone)]
pub struct SqliteQueue {
    pool: DbPool,
    name: Arc<str>,
    wakeup: Arc<Notify>,
}

impl SqliteQueue {
    /// Creates a queue named `name` over `pool`. The pool's database must
    /// have migrations applied.
    pub fn new(pool: DbPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: Arc::from(name.into()),
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// Number of items currently waiting.
    pub async fn pending(&self) -> Result<usize, QueueError> {
        let pool = self.pool.clone();
        let name = Arc::clone(&self.name);
        tokio::task::spawn_blocking(move || -> Result<usize, QueueError> {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM event_queue WHERE queue_name = ?1",
                [&*name],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await?
    }

    async fn try_pop(&self) -> Result<Option<Event>, QueueError> {
        let pool = self.pool.clone();
        let name = Arc::clone(&self.name);
        let payload = tokio::task::spawn_blocking(move || -> Result<Option<String>, QueueError> {
            let conn = pool.get()?;
            let payload = conn
                .query_row(
                    "DELETE FROM event_queue
                     WHERE seq = (SELECT MIN(seq) FROM event_queue WHERE queue_name = ?1)
                     RETURNING payload_json",
                    [&*name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(payload)
        })
        .await??;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl EventQueue for SqliteQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, event: &Event) -> Result<(), QueueError> {
        let payload = serde_json::to_string(event)?;
        let pool = self.pool.clone();
        let name = Arc::clone(&self.name);
        tokio::task::spawn_blocking(move || -> Result<(), QueueError> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO event_queue (queue_name, payload_json) VALUES (?1, ?2)",
                rusqlite::params![&*name, payload],
            )?;
            Ok(())
        })
        .await??;

        tracing::debug!(queue = %self.name, event_id = event.id, "event enqueued");
        self.wakeup.notify_one();
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<Event>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_pop().await? {
                return Ok(Some(event));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // Either a push wakes us or we re-check at the next poll tick.
            let _ = tokio::time::timeout_at(deadline.min(now + POLL_INTERVAL), self.wakeup.notified())
                .await;
        }
    }
}
