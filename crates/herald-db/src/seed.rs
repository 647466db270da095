//! Demo directory data for local development.

use rusqlite::{params, Connection};

/// Demo accounts inserted by [`seed_demo_users`].
const DEMO_USERS: &[(&str, &str)] = &[
    ("john_architect", "john@example.com"),
    ("sarah_designer", "sarah@example.com"),
    ("mike_planner", "mike@example.com"),
];

/// Inserts the demo users if they are not already present.
///
/// Returns the number of rows actually inserted.
///
/// # Errors
///
/// Returns the underlying SQLite error if an insert fails.
pub fn seed_demo_users(conn: &Connection) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO users (username, email) VALUES (?1, ?2)")?;
    let mut inserted = 0;
    for (username, email) in DEMO_USERS {
        inserted += stmt.execute(params![username, email])?;
    }
    Ok(inserted)
}
