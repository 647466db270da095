//! Dispatch worker: drains the queue and turns events into notifications.
//!
//! One worker task is the only place notifications are generated. Each
//! popped event goes through build → insert → mark processed in a single
//! transaction and, if a new row was written, is published to the
//! recipient's live connections. Failures are logged and contained to the
//! event that caused them; the event stays unprocessed and the loop moves on.

use crate::AppState;
use herald_db::DbPool;
use herald_notify::{build, BuildError};
use herald_store::{get_event, insert_notification, mark_processed, InsertOutcome, StoreError};
use herald_types::{Event, Notification};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Pause after a queue error so a down backend does not spin the loop.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Floor for the pop timeout. A zero-timeout pop returns at once on every
/// backend, which would turn an idle loop into a busy one.
const MIN_POP_TIMEOUT: Duration = Duration::from_millis(50);

/// Why one event could not be dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("dispatch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result of dispatching one event.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A notification was created and pushed to `delivered` live connections.
    Created {
        notification: Notification,
        delivered: usize,
    },
    /// The event was already marked processed; nothing was done.
    AlreadyProcessed,
    /// A notification for this event already existed. The event is now
    /// marked processed; nothing is published again.
    AlreadyNotified { notification: Notification },
}

/// Dispatches a single event.
///
/// The stored row is re-read first so a stale queue copy of an already
/// processed event is skipped.
pub async fn process_event(state: &AppState, event: &Event) -> Result<DispatchOutcome, DispatchError> {
    let stored = store_notification(state.pool.clone(), event.id).await?;

    match stored {
        None => Ok(DispatchOutcome::AlreadyProcessed),
        Some(InsertOutcome::Existing(notification)) => {
            Ok(DispatchOutcome::AlreadyNotified { notification })
        }
        Some(InsertOutcome::Created(notification)) => {
            let delivered = state.registry.publish(&notification).await;
            Ok(DispatchOutcome::Created {
                notification,
                delivered,
            })
        }
    }
}

/// Builds and persists the notification for `event_id`, marking the event
/// processed in the same transaction. `None` means the event was already
/// processed.
async fn store_notification(
    pool: DbPool,
    event_id: i64,
) -> Result<Option<InsertOutcome>, DispatchError> {
    tokio::task::spawn_blocking(move || -> Result<Option<InsertOutcome>, DispatchError> {
        let mut conn = pool.get()?;
        let tx = conn.transaction()?;

        let event = get_event(&tx, event_id)?;
        if event.processed {
            return Ok(None);
        }

        let draft = build(&*tx, &event)?;
        let outcome = insert_notification(&tx, &draft)?;
        mark_processed(&tx, event.id)?;
        tx.commit()?;

        Ok(Some(outcome))
    })
    .await?
}

/// Runs the dispatch loop until `shutdown` turns `true`.
///
/// Shutdown is observed between pops, so the loop exits at most one pop
/// timeout after the signal. An in-flight pop is never cancelled, so a
/// popped event is never lost to shutdown. `pop_timeout` is raised to
/// [`MIN_POP_TIMEOUT`] if shorter.
pub async fn run(state: AppState, pop_timeout: Duration, shutdown: watch::Receiver<bool>) {
    let pop_timeout = pop_timeout.max(MIN_POP_TIMEOUT);
    tracing::info!(
        queue = %state.queue.name(),
        pop_timeout_secs = pop_timeout.as_secs_f64(),
        "dispatch worker started"
    );

    while !*shutdown.borrow() {
        let event = match state.queue.pop_blocking(pop_timeout).await {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!("queue pop failed: {}", e);
                tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                continue;
            }
        };

        handle_event(&state, &event).await;
    }

    tracing::info!("dispatch worker stopped");
}

async fn handle_event(state: &AppState, event: &Event) {
    match process_event(state, event).await {
        Ok(DispatchOutcome::Created {
            notification,
            delivered,
        }) => {
            tracing::info!(
                event_id = event.id,
                notification_id = %notification.id,
                recipient_id = notification.recipient_id,
                delivered,
                "notification created"
            );
        }
        Ok(DispatchOutcome::AlreadyProcessed) => {
            tracing::debug!(event_id = event.id, "event already processed, skipping");
        }
        Ok(DispatchOutcome::AlreadyNotified { notification }) => {
            tracing::debug!(
                event_id = event.id,
                notification_id = %notification.id,
                "notification already exists for event"
            );
        }
        Err(DispatchError::Build(e @ BuildError::UnknownEventType(_))) => {
            tracing::warn!(event_id = event.id, "skipping event: {}", e);
        }
        Err(DispatchError::Build(e)) if e.is_lookup_failure() => {
            tracing::warn!(event_id = event.id, "lookup failed, event left unprocessed: {}", e);
        }
        Err(e) => {
            tracing::error!(event_id = event.id, "failed to dispatch event: {}", e);
        }
    }
}
