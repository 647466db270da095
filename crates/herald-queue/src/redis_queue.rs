//! Queue backed by a Redis list.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use herald_types::Event;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{EventQueue, QueueError};

/// Redis list queue: producers `LPUSH`, the consumer `BRPOP`s, giving FIFO
/// order on a single key.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    key: String,
}

impl fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueue")
            .field("connection", &"ConnectionManager")
            .field("key", &self.key)
            .finish()
    }
}

impl RedisQueue {
    /// Connects to `redis_url` and uses the list at `key`.
    pub async fn connect(redis_url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let key = key.into();
        tracing::info!(url = redis_url, key = %key, "connecting to redis queue");

        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn, key })
    }
}

#[async_trait]
impl EventQueue for RedisQueue {
    fn name(&self) -> &str {
        &self.key
    }

    async fn push(&self, event: &Event) -> Result<(), QueueError> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(&self.key, payload).await?;

        tracing::debug!(key = %self.key, event_id = event.id, "event enqueued");
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<Event>, QueueError> {
        let mut conn = self.conn.clone();

        // BRPOP treats a zero timeout as "block forever".
        let payload: Option<String> = if timeout.is_zero() {
            conn.rpop(&self.key, None).await?
        } else {
            let popped: Option<(String, String)> =
                conn.brpop(&self.key, timeout.as_secs_f64()).await?;
            popped.map(|(_key, payload)| payload)
        };

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
