//! Persistence for the notification pipeline.
//!
//! Three stores live here, all as plain functions over a
//! [`rusqlite::Connection`]:
//!
//! - the **event store** ([`insert_event`], [`mark_processed`], ...) records
//!   every submitted event and its processed flag;
//! - the **notification store** ([`insert_notification`],
//!   [`list_notifications`], [`mark_read`]) holds generated notifications
//!   and their read state;
//! - the **directory** ([`get_user`], [`notification_type_id`]) answers the
//!   read-only lookups the notification builder needs.
//!
//! Callers on an async runtime should run these inside
//! `tokio::task::spawn_blocking` with a pooled connection.

mod directory;
mod error;
mod events;
mod notifications;

pub use directory::{get_user, list_users, notification_type_id};
pub use error::StoreError;
pub use events::{
    get_event, insert_event, list_stranded_events, mark_processed, record_requeue,
};
pub use notifications::{
    get_notification, insert_notification, list_notifications, mark_read, InsertOutcome,
    DEFAULT_PAGE_SIZE,
};
