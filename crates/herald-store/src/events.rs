//! Event store: durable record of every submitted event.

use herald_types::{Event, EventKind, NewEvent, Payload};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;

const EVENT_COLUMNS: &str = "id, type, actor_id, target_id, data_json, processed, created_at";

/// Inserts a submitted event and returns the stored record.
///
/// The raw `type` string is stored as-is, recognised or not.
pub fn insert_event(conn: &Connection, new_event: &NewEvent) -> Result<Event, StoreError> {
    let data_json = serde_json::to_string(&new_event.data)?;

    let event = conn.query_row(
        &format!(
            "INSERT INTO events (type, actor_id, target_id, data_json)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {EVENT_COLUMNS}"
        ),
        params![
            new_event.event_type,
            new_event.actor_id,
            new_event.target_id,
            data_json,
        ],
        map_row_to_event,
    )?;

    tracing::debug!(event_id = event.id, event_type = %event.event_type, "event stored");
    Ok(event)
}

/// Retrieves an event by ID.
pub fn get_event(conn: &Connection, event_id: i64) -> Result<Event, StoreError> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
        [event_id],
        map_row_to_event,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "event",
        id: event_id.to_string(),
    })
}

/// Marks an event as processed.
///
/// Returns `true` if the flag changed, `false` if it was already set.
pub fn mark_processed(conn: &Connection, event_id: i64) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE events SET processed = 1 WHERE id = ?1 AND processed = 0",
        [event_id],
    )?;
    if changed == 0 {
        // Distinguish "already processed" from "no such event".
        get_event(conn, event_id)?;
    }
    Ok(changed > 0)
}

/// Lists unprocessed events of the given kinds that are due for another
/// enqueue attempt.
///
/// An event is due once `grace_secs` have passed since it arrived, or since
/// it was last re-enqueued. Events already re-enqueued `max_requeues` times
/// are left alone. Events never re-enqueued come first, then the ones
/// retried longest ago, so rows that keep failing cannot crowd out newer
/// stranded events.
///
/// Used by the reconciler to recover events stranded by a crash between
/// queue pop and store write.
pub fn list_stranded_events(
    conn: &Connection,
    kinds: &[EventKind],
    grace_secs: u64,
    max_requeues: u32,
    limit: u32,
) -> Result<Vec<Event>, StoreError> {
    if kinds.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (0..kinds.len()).map(|i| format!("?{}", i + 4)).collect();
    let sql = format!(
        "SELECT {EVENT_COLUMNS}
         FROM events
         WHERE processed = 0
           AND requeue_count < ?3
           AND COALESCE(last_requeued_at, created_at)
               <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)
           AND type IN ({})
         ORDER BY last_requeued_at IS NOT NULL, last_requeued_at ASC, id ASC
         LIMIT ?2",
        placeholders.join(", ")
    );

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(format!("-{grace_secs} seconds")),
        Box::new(limit),
        Box::new(max_requeues),
    ];
    for kind in kinds {
        param_values.push(Box::new(kind.as_str()));
    }
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), map_row_to_event)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Records that an event was pushed back onto the queue by the reconciler.
pub fn record_requeue(conn: &Connection, event_id: i64) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE events
         SET requeue_count = requeue_count + 1,
             last_requeued_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        [event_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "event",
            id: event_id.to_string(),
        });
    }
    Ok(())
}

fn map_row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let data_json: String = row.get(4)?;
    let data: Payload = serde_json::from_str(&data_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Event {
        id: row.get(0)?,
        event_type: row.get(1)?,
        actor_id: row.get(2)?,
        target_id: row.get(3)?,
        data,
        processed: row.get(5)?,
        created_at: row.get(6)?,
    })
}
