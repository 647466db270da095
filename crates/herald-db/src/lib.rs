//! Database layer for Herald.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations and demo seed data. Every table the notification
//! pipeline touches (`users`, `notification_types`, `events`,
//! `notifications`, `event_queue`) is created through versioned migrations
//! managed by this crate.

mod migrations;
mod pool;
mod seed;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use seed::seed_demo_users;
