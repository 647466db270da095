//! Notification builder for Herald.
//!
//! Turns a stored [`Event`](herald_types::Event) into a
//! [`NotificationDraft`](herald_types::NotificationDraft): who receives it,
//! its title and message, and the structured payload clients render from.
//! The only I/O is read-only lookups through a [`Directory`]; nothing is
//! written.
//!
//! Each [`EventKind`](herald_types::EventKind) maps to exactly one static
//! [`Rule`] (see [`rule_for`]), so supporting a new kind means adding a
//! variant and its rule.
//!
//! ```rust,ignore
//! let draft = herald_notify::build(&conn, &event)?;
//! ```

mod builder;
mod directory;
mod error;
mod rules;

pub use builder::build;
pub use directory::Directory;
pub use error::BuildError;
pub use rules::{rule_for, RecipientPolicy, Rule};

#[cfg(test)]
mod tests;
