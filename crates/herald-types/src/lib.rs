//! Shared types for the Herald notification pipeline.
//!
//! Every crate in the workspace depends on `herald-types` for the records
//! that cross crate boundaries: submitted [`Event`]s, generated
//! [`Notification`]s, directory [`User`]s and the [`LiveFrame`] envelope
//! pushed over WebSocket connections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open key/value payload carried by events and notifications.
pub type Payload = Map<String, Value>;

/// Name of the live-push frame carrying a freshly created notification.
pub const NEW_NOTIFICATION_EVENT: &str = "newNotification";

/// The closed set of event kinds the pipeline knows how to turn into
/// notifications.
///
/// Events are stored with their raw `type` string so that unrecognised
/// submissions are still recorded; parsing into `EventKind` happens when a
/// notification is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A user started following another user.
    Follow,
    /// A user liked a post.
    Like,
    /// A user commented on a post.
    Comment,
    /// A user mentioned another user.
    Mention,
}

impl EventKind {
    /// All recognised kinds, in seed order.
    pub const ALL: [EventKind; 4] = [Self::Follow, Self::Like, Self::Comment, Self::Mention];

    /// Returns the canonical string label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Mention => "mention",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(Self::Follow),
            "like" => Ok(Self::Like),
            "comment" => Ok(Self::Comment),
            "mention" => Ok(Self::Mention),
            _ => Err(ParseEventKindError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventKindError(pub String);

impl std::fmt::Display for ParseEventKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for ParseEventKindError {}

/// A submitted domain event, as stored in the `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Auto-incremented row ID.
    pub id: i64,
    /// Raw event type as submitted (`follow`, `like`, ...).
    #[serde(rename = "type")]
    pub event_type: String,
    /// The user who performed the action.
    pub actor_id: i64,
    /// The user or post the action was aimed at.
    pub target_id: i64,
    /// Type-specific payload (e.g. `post_owner_id`, `comment`, `context`).
    #[serde(default)]
    pub data: Payload,
    /// Set once a notification has been generated for this event.
    pub processed: bool,
    /// ISO 8601 arrival timestamp.
    pub created_at: String,
}

impl Event {
    /// Parses the raw type string into a known [`EventKind`].
    pub fn kind(&self) -> Result<EventKind, ParseEventKindError> {
        self.event_type.parse()
    }
}

/// Parameters for submitting a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub actor_id: i64,
    pub target_id: i64,
    #[serde(default)]
    pub data: Payload,
}

/// A generated, recipient-addressed notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Public notification ID (UUID v4).
    pub id: String,
    /// The event this notification was generated from.
    pub event_id: i64,
    /// The user this notification is addressed to.
    pub recipient_id: i64,
    /// Notification type name (matches the event kind).
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    /// Structured payload; always carries `actor_id` and `actor_display_name`.
    pub data: Payload,
    /// The actor's current username from the directory, looked up when the
    /// row is read. `None` if the actor no longer exists.
    #[serde(default)]
    pub actor_display_name: Option<String>,
    /// ISO 8601 timestamp of the first read acknowledgement.
    pub read_at: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A built but not yet persisted notification.
///
/// Produced by the notification builder and handed to the notification
/// store, which assigns `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    /// Public notification ID (UUID v4), fresh for every build.
    pub id: String,
    pub event_id: i64,
    pub recipient_id: i64,
    pub kind: EventKind,
    /// Row ID of the kind in `notification_types`.
    pub type_id: i64,
    pub title: String,
    pub message: String,
    pub data: Payload,
}

/// A directory entry used to resolve actor display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Server-to-client frame delivered over a live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum LiveFrame {
    /// A notification addressed to the connection's recipient.
    #[serde(rename = "newNotification")]
    NewNotification(Notification),
    /// Acknowledges that the connection joined a recipient group.
    #[serde(rename = "joined")]
    Joined {
        #[serde(rename = "userId")]
        user_id: i64,
    },
    /// Acknowledges that the connection left its recipient group.
    #[serde(rename = "left")]
    Left,
    /// A protocol error caused by the client's last frame.
    #[serde(rename = "error")]
    Error { message: String },
}
