//! Event ingestion: persist, then enqueue.

use herald_db::DbPool;
use herald_queue::{EventQueue, QueueError};
use herald_store::{insert_event, StoreError};
use herald_types::{Event, NewEvent};
use thiserror::Error;

/// Errors surfaced to the caller of [`submit_event`].
///
/// Generation failures never appear here; they happen later, in the worker.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid event: {0}")]
    Invalid(String),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The event row exists but never reached the queue. The reconciler,
    /// when enabled, picks it up after the grace period.
    #[error("event {event_id} stored but not enqueued: {source}")]
    Enqueue {
        event_id: i64,
        #[source]
        source: QueueError,
    },

    #[error("ingest task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Records `new_event` in the event store and pushes it onto the queue.
///
/// Returns the stored event as soon as it is enqueued. Unrecognised types
/// are accepted and stored; the worker decides what to do with them.
pub async fn submit_event(
    pool: &DbPool,
    queue: &dyn EventQueue,
    new_event: NewEvent,
) -> Result<Event, IngestError> {
    if new_event.event_type.trim().is_empty() {
        return Err(IngestError::Invalid("type must not be empty".to_string()));
    }

    let pool = pool.clone();
    let event = tokio::task::spawn_blocking(move || -> Result<Event, IngestError> {
        let conn = pool.get()?;
        Ok(insert_event(&conn, &new_event)?)
    })
    .await??;

    queue
        .push(&event)
        .await
        .map_err(|source| IngestError::Enqueue {
            event_id: event.id,
            source,
        })?;

    tracing::info!(
        event_id = event.id,
        event_type = %event.event_type,
        actor_id = event.actor_id,
        target_id = event.target_id,
        "event submitted"
    );

    Ok(event)
}
