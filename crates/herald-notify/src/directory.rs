//! Read-only lookups the builder depends on.

use herald_store::StoreError;
use herald_types::EventKind;
use rusqlite::Connection;

/// Resolves actor display names and notification type IDs.
///
/// Implemented for [`rusqlite::Connection`] on top of the `herald-store`
/// directory queries.
pub trait Directory {
    /// Returns the display name of `user_id`, or `None` if unknown.
    fn display_name(&self, user_id: i64) -> Result<Option<String>, StoreError>;

    /// Returns the `notification_types` row ID for `kind`, or `None`.
    fn notification_type_id(&self, kind: EventKind) -> Result<Option<i64>, StoreError>;
}

impl Directory for Connection {
    fn display_name(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        Ok(herald_store::get_user(self, user_id)?.map(|user| user.username))
    }

    fn notification_type_id(&self, kind: EventKind) -> Result<Option<i64>, StoreError> {
        herald_store::notification_type_id(self, kind.as_str())
    }
}
