use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::notify::protocol::ServerEvent;
use crate::notify::{DeliveryError, NotificationTransport};

/// A handle to send events to one connected WebSocket client.
#[derive(Debug, Clone)]
struct Connection {
    id: u64,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Registry of live WebSocket sessions keyed by user id.
///
/// A user may hold several sessions (tabs, devices); an event for that user
/// is copied to each of them.
#[derive(Default)]
pub struct NotificationHub {
    connections: RwLock<HashMap<Uuid, Vec<Connection>>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session for a user. Returns the connection id needed
    /// to unregister it and the receiver the session should listen on.
    pub async fn register(&self, user_id: Uuid) -> (u64, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut connections = self.connections.write().await;
        connections
            .entry(user_id)
            .or_default()
            .push(Connection { id, sender: tx });

        (id, rx)
    }

    /// Remove one session of a user.
    pub async fn unregister(&self, user_id: Uuid, connection_id: u64) {
        let mut connections = self.connections.write().await;

        if let Some(sessions) = connections.get_mut(&user_id) {
            sessions.retain(|c| c.id != connection_id);
            if sessions.is_empty() {
                connections.remove(&user_id);
            }
        }
    }

    /// Send an event to every session of a user. Returns how many sessions
    /// accepted it; zero means the user is offline.
    pub async fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) -> usize {
        let connections = self.connections.read().await;
        connections
            .get(&user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    // A failed send means the session is gone; unregister cleans it up.
                    .filter(|c| c.sender.send(event.clone()).is_ok())
                    .count()
            })
            .unwrap_or(0)
    }

    pub async fn is_user_online(&self, user_id: Uuid) -> bool {
        let connections = self.connections.read().await;
        connections
            .get(&user_id)
            .is_some_and(|sessions| !sessions.is_empty())
    }
}

impl NotificationTransport for NotificationHub {
    async fn deliver(&self, user_id: Uuid, event: ServerEvent) -> Result<usize, DeliveryError> {
        Ok(self.send_to_user(user_id, &event).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hired() -> ServerEvent {
        ServerEvent::bid_hired(Uuid::new_v4(), "Landing page", Uuid::new_v4())
    }

    #[tokio::test]
    async fn event_reaches_every_session_of_the_user() {
        let hub = NotificationHub::new();
        let user = Uuid::new_v4();
        let (_, mut first) = hub.register(user).await;
        let (_, mut second) = hub.register(user).await;

        assert_eq!(hub.send_to_user(user, &hired()).await, 2);
        assert!(matches!(first.recv().await, Some(ServerEvent::BidHired { .. })));
        assert!(matches!(second.recv().await, Some(ServerEvent::BidHired { .. })));
    }

    #[tokio::test]
    async fn offline_user_gets_nothing() {
        let hub = NotificationHub::new();
        let other = Uuid::new_v4();
        let (_, mut rx) = hub.register(other).await;

        assert_eq!(hub.send_to_user(Uuid::new_v4(), &hired()).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_removes_only_that_session() {
        let hub = NotificationHub::new();
        let user = Uuid::new_v4();
        let (first_id, _first) = hub.register(user).await;
        let (second_id, _second) = hub.register(user).await;

        hub.unregister(user, first_id).await;
        assert!(hub.is_user_online(user).await);
        assert_eq!(hub.send_to_user(user, &hired()).await, 1);

        hub.unregister(user, second_id).await;
        assert!(!hub.is_user_online(user).await);
    }

    #[tokio::test]
    async fn dropped_receiver_is_not_counted() {
        let hub = NotificationHub::new();
        let user = Uuid::new_v4();
        let (_, rx) = hub.register(user).await;
        drop(rx);

        assert_eq!(hub.send_to_user(user, &hired()).await, 0);
    }
}
