//! Notification store: generated notifications and their read state.

use herald_types::{Notification, NotificationDraft, Payload};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;

/// Page size used by the read boundary when listing notifications.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const NOTIFICATION_SELECT: &str = "SELECT
        n.notification_id, n.event_id, n.recipient_id, t.name, n.title,
        n.message, n.data_json, n.read_at, n.created_at, actor.username
    FROM notifications n
    JOIN notification_types t ON t.id = n.type_id
    LEFT JOIN users actor ON actor.id = json_extract(n.data_json, '$.actor_id')";

/// Result of [`insert_notification`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// A new row was written.
    Created(Notification),
    /// A notification for the same event already existed; it is returned
    /// unchanged and the draft is discarded.
    Existing(Notification),
}

impl InsertOutcome {
    /// Returns the stored notification regardless of outcome.
    pub fn notification(&self) -> &Notification {
        match self {
            Self::Created(n) | Self::Existing(n) => n,
        }
    }

    /// Consumes the outcome, returning the stored notification.
    pub fn into_notification(self) -> Notification {
        match self {
            Self::Created(n) | Self::Existing(n) => n,
        }
    }

    /// Whether this call wrote a new row.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Persists a built notification, keyed by its source event.
///
/// At most one notification exists per event: if one is already stored for
/// `draft.event_id`, nothing is written and the existing row is returned as
/// [`InsertOutcome::Existing`]. This makes re-delivery of an event safe.
pub fn insert_notification(
    conn: &Connection,
    draft: &NotificationDraft,
) -> Result<InsertOutcome, StoreError> {
    let data_json = serde_json::to_string(&draft.data)?;

    let inserted = conn.execute(
        "INSERT INTO notifications
            (notification_id, event_id, recipient_id, type_id, title, message, data_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(event_id) DO NOTHING",
        params![
            draft.id,
            draft.event_id,
            draft.recipient_id,
            draft.type_id,
            draft.title,
            draft.message,
            data_json,
        ],
    )?;

    let stored = conn
        .query_row(
            &format!("{NOTIFICATION_SELECT} WHERE n.event_id = ?1"),
            [draft.event_id],
            map_row_to_notification,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            entity: "notification for event",
            id: draft.event_id.to_string(),
        })?;

    if inserted > 0 {
        Ok(InsertOutcome::Created(stored))
    } else {
        tracing::debug!(
            event_id = draft.event_id,
            notification_id = %stored.id,
            "notification already stored for event"
        );
        Ok(InsertOutcome::Existing(stored))
    }
}

/// Retrieves a notification by its public ID.
pub fn get_notification(conn: &Connection, notification_id: &str) -> Result<Notification, StoreError> {
    conn.query_row(
        &format!("{NOTIFICATION_SELECT} WHERE n.notification_id = ?1"),
        [notification_id],
        map_row_to_notification,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound {
        entity: "notification",
        id: notification_id.to_string(),
    })
}

/// Lists a recipient's notifications, newest first, at most `limit` rows.
pub fn list_notifications(
    conn: &Connection,
    recipient_id: i64,
    limit: u32,
) -> Result<Vec<Notification>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "{NOTIFICATION_SELECT} WHERE n.recipient_id = ?1 ORDER BY n.seq DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![recipient_id, limit], map_row_to_notification)?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

/// Acknowledges a notification as read and returns the updated record.
///
/// `read_at` is only set the first time; marking an already-read
/// notification leaves the original timestamp in place.
pub fn mark_read(conn: &Connection, notification_id: &str) -> Result<Notification, StoreError> {
    conn.execute(
        "UPDATE notifications
         SET read_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE notification_id = ?1 AND read_at IS NULL",
        [notification_id],
    )?;
    get_notification(conn, notification_id)
}

fn map_row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let data_json: String = row.get(6)?;
    let data: Payload = serde_json::from_str(&data_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Notification {
        id: row.get(0)?,
        event_id: row.get(1)?,
        recipient_id: row.get(2)?,
        kind: row.get(3)?,
        title: row.get(4)?,
        message: row.get(5)?,
        data,
        actor_display_name: row.get(9)?,
        read_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}
