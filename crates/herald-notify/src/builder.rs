//! Event → notification draft mapping.

use herald_types::{Event, NotificationDraft, Payload};
use serde_json::Value;
use uuid::Uuid;

use crate::directory::Directory;
use crate::error::BuildError;
use crate::rules::rule_for;

/// Builds the notification for `event`.
///
/// Content (recipient, title, message, payload) is a pure function of the
/// event and the directory; the draft ID is a fresh UUID on every call, so
/// building the same event twice yields two distinct drafts.
///
/// # Errors
///
/// - [`BuildError::UnknownEventType`] if `event.type` is not a known kind.
/// - [`BuildError::ActorNotFound`] if the actor does not resolve.
/// - [`BuildError::NotificationTypeNotFound`] if the kind has no type row.
/// - [`BuildError::Directory`] if a lookup itself fails.
pub fn build<D>(directory: &D, event: &Event) -> Result<NotificationDraft, BuildError>
where
    D: Directory + ?Sized,
{
    let kind = event
        .kind()
        .map_err(|e| BuildError::UnknownEventType(e.0))?;
    let rule = rule_for(kind);

    let actor_name = directory
        .display_name(event.actor_id)?
        .ok_or(BuildError::ActorNotFound(event.actor_id))?;
    let type_id = directory
        .notification_type_id(kind)?
        .ok_or(BuildError::NotificationTypeNotFound(kind))?;

    let mut data = Payload::new();
    data.insert("actor_id".to_string(), Value::from(event.actor_id));
    data.insert(
        "actor_display_name".to_string(),
        Value::String(actor_name.clone()),
    );
    (rule.extend_payload)(event, &mut data);

    let draft = NotificationDraft {
        id: Uuid::new_v4().to_string(),
        event_id: event.id,
        recipient_id: rule.recipient_of(event),
        kind,
        type_id,
        title: rule.title.to_string(),
        message: (rule.message)(&actor_name),
        data,
    };

    tracing::trace!(
        event_id = event.id,
        kind = %kind,
        recipient_id = draft.recipient_id,
        "notification built"
    );

    Ok(draft)
}
