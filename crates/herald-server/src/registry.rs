//! Live connection registry and notification fanout.

use herald_types::{LiveFrame, Notification};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Bounded per-connection outbound buffer. Beyond this the client is too
/// slow and frames are dropped.
pub const CONNECTION_BUFFER: usize = 256;

#[derive(Default)]
struct RegistryState {
    /// Outbound channel of every open connection.
    sessions: HashMap<Uuid, mpsc::Sender<String>>,
    /// Recipient -> connections currently joined as that recipient.
    by_recipient: HashMap<i64, HashSet<Uuid>>,
    /// Connection -> the recipient it joined as.
    by_connection: HashMap<Uuid, i64>,
}

impl RegistryState {
    /// Detaches `connection_id` from its recipient group, dropping the group
    /// when it becomes empty.
    fn detach(&mut self, connection_id: Uuid) -> Option<i64> {
        let recipient_id = self.by_connection.remove(&connection_id)?;
        if let Some(members) = self.by_recipient.get_mut(&recipient_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.by_recipient.remove(&recipient_id);
            }
        }
        Some(recipient_id)
    }
}

/// Tracks open live connections and which recipient each one has joined.
///
/// A connection belongs to at most one recipient; a recipient may have any
/// number of connections (several tabs or devices). All three maps sit
/// behind one lock, so a publish never sees a recipient set mid-update.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly opened connection and returns its ID. The connection
    /// receives nothing until it is [`register`](Self::register)ed.
    pub async fn connect(&self, sender: mpsc::Sender<String>) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.inner.write().await.sessions.insert(connection_id, sender);
        connection_id
    }

    /// Joins `connection_id` to `recipient_id`'s group.
    ///
    /// Idempotent. A connection already joined to another recipient is moved.
    /// Returns `false` (and does nothing) if the connection is not open.
    pub async fn register(&self, recipient_id: i64, connection_id: Uuid) -> bool {
        let mut state = self.inner.write().await;
        if !state.sessions.contains_key(&connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                recipient_id,
                "ignoring join for unknown connection"
            );
            return false;
        }

        if state.by_connection.get(&connection_id) == Some(&recipient_id) {
            return true;
        }
        if let Some(previous) = state.detach(connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                previous,
                recipient_id,
                "moving connection to another recipient"
            );
        }

        state
            .by_recipient
            .entry(recipient_id)
            .or_default()
            .insert(connection_id);
        state.by_connection.insert(connection_id, recipient_id);
        true
    }

    /// Removes `connection_id` from its recipient group but keeps it open.
    /// Returns the recipient it had joined, if any.
    pub async fn leave(&self, connection_id: Uuid) -> Option<i64> {
        self.inner.write().await.detach(connection_id)
    }

    /// Forgets a closed connection entirely. No-op when unknown.
    pub async fn unregister(&self, connection_id: Uuid) {
        let mut state = self.inner.write().await;
        state.sessions.remove(&connection_id);
        state.detach(connection_id);
    }

    /// Pushes `notification` to every connection joined as its recipient.
    ///
    /// Returns the number of connections the frame was queued for. No
    /// connections is the normal case for offline users and returns 0.
    pub async fn publish(&self, notification: &Notification) -> usize {
        let frame = LiveFrame::NewNotification(notification.clone());
        let message = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(
                    notification_id = %notification.id,
                    "failed to serialize notification frame: {}",
                    e
                );
                return 0;
            }
        };

        let recipient_id = notification.recipient_id;
        let state = self.inner.read().await;
        let Some(members) = state.by_recipient.get(&recipient_id) else {
            tracing::debug!(recipient_id, "no live connections for recipient");
            return 0;
        };

        let mut delivered = 0;
        for connection_id in members {
            let Some(sender) = state.sessions.get(connection_id) else {
                continue;
            };
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        recipient_id,
                        "dropping notification for slow consumer: {}",
                        e
                    );
                }
            }
        }
        delivered
    }

    /// Sends a frame to one connection. Returns whether it was queued.
    pub async fn send(&self, connection_id: Uuid, frame: &LiveFrame) -> bool {
        let message = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("failed to serialize live frame: {}", e);
                return false;
            }
        };

        let state = self.inner.read().await;
        let Some(sender) = state.sessions.get(&connection_id) else {
            return false;
        };
        if let Err(e) = sender.try_send(message) {
            tracing::warn!(
                connection_id = %connection_id,
                "dropping direct frame for slow consumer: {}",
                e
            );
            return false;
        }
        true
    }

    /// Number of connections joined as `recipient_id`.
    pub async fn connection_count(&self, recipient_id: i64) -> usize {
        self.inner
            .read()
            .await
            .by_recipient
            .get(&recipient_id)
            .map_or(0, HashSet::len)
    }

    /// The recipient `connection_id` has joined, if any.
    pub async fn recipient_of(&self, connection_id: Uuid) -> Option<i64> {
        self.inner.read().await.by_connection.get(&connection_id).copied()
    }

    /// Number of open connections, joined or not.
    pub async fn open_connections(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_types::Payload;

    fn notification_for(recipient_id: i64) -> Notification {
        Notification {
            id: "n-1".to_string(),
            event_id: 1,
            recipient_id,
            kind: "follow".to_string(),
            title: "New Follower".to_string(),
            message: "john_architect started following you".to_string(),
            data: Payload::new(),
            actor_display_name: None,
            read_at: None,
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn both_connections_of_a_recipient_receive() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(CONNECTION_BUFFER);
        let (tx_b, mut rx_b) = mpsc::channel(CONNECTION_BUFFER);
        let a = registry.connect(tx_a).await;
        let b = registry.connect(tx_b).await;
        registry.register(9, a).await;
        registry.register(9, b).await;

        assert_eq!(registry.publish(&notification_for(9)).await, 2);

        let frame: serde_json::Value = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
        assert_eq!(frame["event"], "newNotification");
        assert_eq!(frame["payload"]["recipient_id"], 9);
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn unregistering_one_keeps_the_other() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = mpsc::channel(CONNECTION_BUFFER);
        let (tx_b, mut rx_b) = mpsc::channel(CONNECTION_BUFFER);
        let a = registry.connect(tx_a).await;
        let b = registry.connect(tx_b).await;
        registry.register(9, a).await;
        registry.register(9, b).await;

        registry.unregister(a).await;
        assert_eq!(registry.connection_count(9).await, 1);
        assert_eq!(registry.publish(&notification_for(9)).await, 1);
        assert!(rx_b.recv().await.is_some());

        registry.unregister(b).await;
        assert_eq!(registry.connection_count(9).await, 0);
        assert_eq!(registry.publish(&notification_for(9)).await, 0);
    }

    #[tokio::test]
    async fn register_is_idempotent_and_moves_between_recipients() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(CONNECTION_BUFFER);
        let conn = registry.connect(tx).await;

        assert!(registry.register(1, conn).await);
        assert!(registry.register(1, conn).await);
        assert_eq!(registry.connection_count(1).await, 1);

        assert!(registry.register(2, conn).await);
        assert_eq!(registry.connection_count(1).await, 0);
        assert_eq!(registry.recipient_of(conn).await, Some(2));
    }

    #[tokio::test]
    async fn unknown_connections_are_ignored() {
        let registry = ConnectionRegistry::new();
        let ghost = Uuid::new_v4();

        assert!(!registry.register(1, ghost).await);
        registry.unregister(ghost).await;
        assert_eq!(registry.leave(ghost).await, None);
        assert!(!registry.send(ghost, &LiveFrame::Left).await);
        assert_eq!(registry.connection_count(1).await, 0);
    }

    #[tokio::test]
    async fn leave_keeps_connection_open() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(CONNECTION_BUFFER);
        let conn = registry.connect(tx).await;
        registry.register(5, conn).await;

        assert_eq!(registry.leave(conn).await, Some(5));
        assert_eq!(registry.publish(&notification_for(5)).await, 0);
        assert_eq!(registry.open_connections().await, 1);

        assert!(registry.send(conn, &LiveFrame::Left).await);
        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["event"], "left");
    }

    #[tokio::test]
    async fn full_buffer_drops_instead_of_blocking() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let conn = registry.connect(tx).await;
        registry.register(3, conn).await;

        assert_eq!(registry.publish(&notification_for(3)).await, 1);
        assert_eq!(registry.publish(&notification_for(3)).await, 0);
    }
}
