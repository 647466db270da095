//! Error types for notification building.

use herald_store::StoreError;
use herald_types::EventKind;

/// Errors that can occur while building a notification.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The event's type is not one of the recognised kinds.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The actor ID did not resolve to a user.
    #[error("actor not found: {0}")]
    ActorNotFound(i64),

    /// A recognised kind has no row in `notification_types`.
    #[error("notification type not found: {0}")]
    NotificationTypeNotFound(EventKind),

    /// A directory lookup failed.
    #[error("directory lookup failed: {0}")]
    Directory(#[from] StoreError),
}

impl BuildError {
    /// Whether the failure is a missing actor or type row (as opposed to an
    /// unrecognised type or a storage failure).
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::ActorNotFound(_) | Self::NotificationTypeNotFound(_))
    }
}
