//! Best-effort push of marketplace events to connected users.
//!
//! Services never talk to a transport directly. They post events to a
//! [`Dispatcher`], an in-process outbox drained by a background task, so a
//! slow or broken transport can neither delay a response nor undo a commit.

pub mod hub;
pub mod protocol;
pub mod session;

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::notify::protocol::ServerEvent;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),
}

/// Deliver-to-identity-if-connected capability.
///
/// Returns the number of live connections that accepted the event. There is
/// no acknowledgement, retry or persistence.
pub trait NotificationTransport: Send + Sync + 'static {
    fn deliver(
        &self,
        user_id: Uuid,
        event: ServerEvent,
    ) -> impl Future<Output = Result<usize, DeliveryError>> + Send;
}

#[derive(Debug)]
struct Envelope {
    user_id: Uuid,
    event: ServerEvent,
}

/// Cloneable handle to the notification outbox.
#[derive(Clone)]
pub struct Dispatcher {
    outbox: mpsc::UnboundedSender<Envelope>,
}

impl Dispatcher {
    /// Start the delivery task for `transport`. Must be called inside a
    /// Tokio runtime.
    pub fn spawn<T: NotificationTransport>(transport: Arc<T>) -> Self {
        let (outbox, mut rx) = mpsc::unbounded_channel::<Envelope>();

        tokio::spawn(async move {
            while let Some(Envelope { user_id, event }) = rx.recv().await {
                match transport.deliver(user_id, event).await {
                    Ok(0) => debug!(%user_id, "recipient offline, notification dropped"),
                    Ok(sessions) => debug!(%user_id, sessions, "notification delivered"),
                    Err(e) => warn!(%user_id, error = %e, "notification delivery failed"),
                }
            }
            debug!("notification outbox closed");
        });

        Self { outbox }
    }

    /// Queue an event for a user. Never blocks and never fails the caller.
    pub fn notify(&self, user_id: Uuid, event: ServerEvent) {
        if self.outbox.send(Envelope { user_id, event }).is_err() {
            warn!(%user_id, "notification outbox closed, event dropped");
        }
    }
}
