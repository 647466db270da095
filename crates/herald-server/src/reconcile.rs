//! Background re-enqueueing of stranded events.
//!
//! An event can be stored without ever being processed: the push after
//! insert failed, the process died between pop and commit, or a lookup
//! failed at dispatch time. When enabled, this task periodically pushes such
//! events back onto the queue, a bounded number of times per event. The
//! worker skips anything already processed, so overlapping sweeps are
//! harmless.

use crate::config::WorkerConfig;
use crate::worker::DispatchError;
use crate::AppState;
use herald_store::{list_stranded_events, record_requeue};
use herald_types::{Event, EventKind};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

/// Re-enqueues up to `settings.reconcile_batch` unprocessed events of a
/// recognised kind that are due for another attempt. Returns how many were
/// pushed.
///
/// Each push is recorded on the event row. A recorded event waits out the
/// grace period again before its next attempt, yields to events that were
/// never re-enqueued, and is dropped from the sweep after
/// `reconcile_max_attempts` pushes. Events that always fail therefore
/// cannot starve the rest.
pub async fn reconcile_once(
    state: &AppState,
    settings: &WorkerConfig,
) -> Result<usize, DispatchError> {
    let pool = state.pool.clone();
    let grace_secs = settings.reconcile_grace_secs;
    let max_attempts = settings.reconcile_max_attempts;
    let batch = settings.reconcile_batch;
    let stranded = tokio::task::spawn_blocking(move || -> Result<Vec<Event>, DispatchError> {
        let conn = pool.get()?;
        Ok(list_stranded_events(
            &conn,
            &EventKind::ALL,
            grace_secs,
            max_attempts,
            batch,
        )?)
    })
    .await??;

    let mut pushed = Vec::with_capacity(stranded.len());
    for event in &stranded {
        match state.queue.push(event).await {
            Ok(()) => pushed.push(event.id),
            Err(e) => {
                tracing::error!(event_id = event.id, "failed to re-enqueue event: {}", e);
            }
        }
    }
    if pushed.is_empty() {
        return Ok(0);
    }

    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || -> Result<usize, DispatchError> {
        let mut conn = pool.get()?;
        let tx = conn.transaction()?;
        for event_id in &pushed {
            record_requeue(&tx, *event_id)?;
        }
        tx.commit()?;
        Ok(pushed.len())
    })
    .await?
}

/// Starts the reconciler loop. Returns immediately when disabled
/// (`reconcile_interval_secs = 0`).
pub async fn start_reconcile_task(
    state: AppState,
    settings: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    if settings.reconcile_interval_secs == 0 {
        tracing::info!("reconciler disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(settings.reconcile_interval_secs);
    tracing::info!(
        interval_secs = settings.reconcile_interval_secs,
        grace_secs = settings.reconcile_grace_secs,
        batch = settings.reconcile_batch,
        max_attempts = settings.reconcile_max_attempts,
        "starting reconciler"
    );

    loop {
        tokio::select! {
            () = sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        match reconcile_once(&state, &settings).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "re-enqueued stranded events"),
            Err(e) => tracing::error!("reconciler sweep failed: {}", e),
        }
    }

    tracing::info!("reconciler stopped");
}
