//! Read-only directory lookups: users and notification type ids.

use herald_types::User;
use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;

/// Looks up a user by ID. Returns `None` when no such user exists.
pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>, StoreError> {
    let user = conn
        .query_row(
            "SELECT id, username, email FROM users WHERE id = ?1",
            [user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Lists all users ordered by username.
pub fn list_users(conn: &Connection) -> Result<Vec<User>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, username, email FROM users ORDER BY username ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
        })
    })?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Resolves a notification type name (`follow`, `like`, ...) to its row ID.
pub fn notification_type_id(conn: &Connection, name: &str) -> Result<Option<i64>, StoreError> {
    let id = conn
        .query_row(
            "SELECT id FROM notification_types WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}
